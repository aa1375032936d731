//! HTTP API module.
//!
//! The server, its request/response types and the activity log stream.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState, Workspace};
pub use types::*;
