//! Headless host and its line-delimited JSON-RPC server
//!
//! # Submodules
//! - `board` - Board description files
//! - `headless` - `HeadlessHost`, the in-memory board the router edits
//! - `protocol` - Request/response types
//! - `state` - `ServerState`
//! - `handlers` - One handler per request method

pub mod board;
pub mod handlers;
pub mod headless;
pub mod protocol;
pub mod state;

pub use board::BoardDescription;
pub use handlers::handle_request;
pub use headless::{HeadlessHost, Preview};
pub use protocol::{Request, Response};
pub use state::ServerState;
