//! Parameter engine: axis spaces, binding grids, reconstruction, sampling and
//! merge modes. Nothing in here knows about the scene graph beyond
//! [`NodeId`](crate::rig::NodeId).

pub mod axis;
pub mod binding;
pub mod grid;
pub mod merge;
pub mod parameter;
pub mod reconstruct;
pub mod values;

pub use axis::{Axis, AxisLookup, AxisSpace};
pub use binding::{
    Binding, BindingGrid, BindingId, BindingTarget, DEFORM_KEY, DeformationBinding, ValueBinding,
};
pub use grid::{DenseGrid, Grid};
pub use merge::{MergeMode, PositionOffsets};
pub use parameter::{Parameter, ParameterId, Resolved};
pub use reconstruct::GridReconstructor;
pub use values::{Deformation, Interpolatable};
