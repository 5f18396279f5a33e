//! Router error types

use crate::geometry::Point;
use crate::item::NetId;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    #[error("Cannot start routing inside a keepout area.")]
    InsideKeepout,
    #[error("Cannot start routing from a copper item that is not routable.")]
    NotRoutable,
    #[error("The routing start point violates DRC.")]
    StartViolatesDrc,
    #[error("Unable to find complementary differential pair net. Make sure the names of both nets follow the pattern NET+/NET- or NET_P/NET_N.")]
    NoCoupledNet,
    #[error("Unable to find a differential pair anchor near {0:?} on net {1:?}.")]
    NoDiffPairAnchor(Point, Option<NetId>),
    #[error("Net {0:?} is not part of a differential pair track that can be tuned.")]
    NoDiffPairToTune(Option<NetId>),
    #[error("Length tuning requires a track to start from.")]
    NothingToTune,
    #[error("The item under the cursor cannot be dragged.")]
    NotDraggable,
    #[error("The router is busy ({0}).")]
    Busy(&'static str),
}
