//! Rig root and scene-graph boundary.

#[allow(clippy::module_inception)]
pub mod rig;
pub mod sheet;
pub mod target;

pub use rig::{FrameStats, OffsetProducer, ParameterKey, Rig};
pub use sheet::PropertySheet;
pub use target::{NodeId, PropertyTarget};
