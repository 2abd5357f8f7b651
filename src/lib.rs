#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Parameter-driven control layer for 2D character rigs.
//!
//! Named parameters (lines and planes over authored breakpoints) drive node
//! properties and mesh deformations through bindings. Sparse authored grids
//! are completed by the [`GridReconstructor`], sampled bilinearly at each
//! parameter's position, and merged into the scene graph once per frame.
//!
//! ```rust,ignore
//! use myth_rig::{MergeMode, NodeId, Parameter, PropertySheet, Rig};
//!
//! let head = NodeId(1);
//! let mut scene = PropertySheet::new();
//! scene.add_property(head, "transform.t.x", 0.0);
//!
//! let mut rig = Rig::new();
//! let yaw = rig.add_parameter(Parameter::line("head_yaw", vec![0.0, 0.5, 1.0])?);
//! let id = rig.bind_value(yaw, &scene, head, "transform.t.x", MergeMode::Additive)?;
//! let binding = rig.value_binding_mut(yaw, id)?;
//! binding.set_value(0, 0, -30.0)?;
//! binding.set_value(2, 0, 30.0)?;
//!
//! rig.parameter_mut(yaw).unwrap().set_base(glam::Vec2::new(0.75, 0.0));
//! rig.begin_frame();
//! rig.apply(&mut scene);
//! // transform.t.x == 15.0
//! ```

pub mod animation;
pub mod errors;
pub mod param;
pub mod persistence;
pub mod rig;
pub mod settings;

pub use animation::{InterpolationMode, KeyframeTrack, LoopMode, ParameterTimeline};
pub use errors::{Result, RigError};
pub use param::{
    AxisSpace, Binding, BindingId, BindingTarget, Deformation, DeformationBinding, DenseGrid,
    Grid, GridReconstructor, Interpolatable, MergeMode, Parameter, ParameterId, Resolved,
    ValueBinding,
};
pub use persistence::{BindingDesc, ParameterDesc, RigDesc};
pub use rig::{FrameStats, NodeId, OffsetProducer, ParameterKey, PropertySheet, PropertyTarget, Rig};
pub use settings::RigSettings;
