//! String-in, string-out handlers for tool integrations.
//!
//! Each handler takes typed (serde) arguments, runs a search, and renders the
//! outcome as the text a tool caller receives. Only argument and pattern
//! errors are returned as `Err`; everything else degrades to a smaller or
//! empty output.
pub mod search_code;
pub mod search_files;

pub use search_code::{
    format_output, handle_search_code, handle_search_code_json, handle_search_code_with,
    render_reply, SearchCodeArgs, TIMED_OUT_MESSAGE,
};
pub use search_files::{
    handle_search_files, handle_search_files_json, search_files, FileSearchHit, SearchFilesArgs,
};
