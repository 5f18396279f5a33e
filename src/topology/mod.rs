//! Graph algorithms over a node's joints
//!
//! # Submodules
//! - `path` - Trivial path assembly with bounded branch search
//! - `diff_pair` - Coupled line matching
//! - `cluster` - Drag/shove scope assembly
//! - `connectivity` - Reachability, nearest unconnected anchor, leading ratline

mod path;
mod diff_pair;
mod cluster;
mod connectivity;

pub use path::{PathElement, TrivialPath};
pub use diff_pair::DiffPair;
pub use cluster::Cluster;
pub use connectivity::UnconnectedAnchor;

use crate::node::Node;
use std::time::Duration;

/// Default wall-clock budget of the trivial-path branch search
pub const DEFAULT_BRANCH_TIMEOUT: Duration = Duration::from_millis(100);

/// Read-only topology queries against one node
pub struct Topology<'a> {
    world: &'a Node,
    branch_timeout: Duration,
}

impl<'a> Topology<'a> {
    pub fn new(world: &'a Node) -> Self {
        Self { world, branch_timeout: DEFAULT_BRANCH_TIMEOUT }
    }

    pub fn with_branch_timeout(mut self, timeout: Duration) -> Self {
        self.branch_timeout = timeout;
        self
    }

    pub fn world(&self) -> &'a Node {
        self.world
    }
}
