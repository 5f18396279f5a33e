//! Server state

use super::board::BoardDescription;
use super::headless::HeadlessHost;
use crate::router::Router;
use std::path::PathBuf;

/// One loaded board and the router working on it
pub struct ServerState {
    pub router: Option<Router<HeadlessHost>>,
    pub board_path: Option<PathBuf>,
}

impl ServerState {
    pub fn new() -> Self {
        Self { router: None, board_path: None }
    }

    /// Replace whatever is loaded with `board`
    pub fn open(&mut self, board: BoardDescription, path: Option<PathBuf>) {
        let host = HeadlessHost::new(&board);
        self.router = Some(Router::new(host, board.config));
        self.board_path = path;
    }

    pub fn close(&mut self) {
        self.router = None;
        self.board_path = None;
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}
