//! Geometry for the router
//!
//! # Submodules
//! - `types` - Points and bounding boxes
//! - `segment` - Straight segment math
//! - `arc` - Three-point arcs
//! - `chain` - Mixed segment/arc chains
//! - `shape` - Collision shapes and distance
//! - `direction` - 45-degree trace construction
//! - `spatial` - R-tree index over item envelopes

mod types;
mod segment;
mod arc;
mod chain;
mod shape;
mod direction;
mod spatial;

pub use types::{Point, BoundingBox};
pub use segment::Seg;
pub use arc::{ArcGeom, ARC_APPROX_ERROR};
pub use chain::{ChainPiece, LineChain};
pub use shape::{Shape, point_in_polygon};
pub use direction::{Posture, build_initial_trace, is_octilinear};
pub use spatial::{IndexedItem, SpatialIndex};
