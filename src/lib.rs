//! Interactive push-and-shove PCB router
//!
//! The board is mirrored into a `Node`, a copy-on-write item store with
//! spatial search and joint bookkeeping. Routing gestures work on branches of
//! that node and only reach the host board when committed.
//!
//! # Modules
//! - `geometry` - Integer-nanometre points, segments, arcs, chains and shapes
//! - `item` - Board items, layer ranges, joints and lines
//! - `node` - The hierarchical item store and its collision queries
//! - `rules` - Design rules and the clearance resolver
//! - `topology` - Path, cluster and diff-pair assembly over a node
//! - `router` - The router state machine and its placement algorithms
//! - `host` - A headless host and the JSON-RPC server built on it

pub mod geometry;
pub mod host;
pub mod item;
pub mod node;
pub mod router;
pub mod rules;
pub mod topology;
