//! Rig Settings
//!
//! Host-facing configuration of the per-frame pipeline.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_rig::{Rig, RigSettings};
//!
//! // Defaults: clamp positions, reset targets, strict deformation checks
//! let rig = Rig::new();
//!
//! // Editor preview that tolerates meshes being re-topologized live
//! let rig = Rig::with_settings(RigSettings {
//!     strict_deformation: false,
//!     ..Default::default()
//! });
//!
//! // Loaded from a host config file
//! let settings = RigSettings::from_json(r#"{ "reset_targets": false }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Configuration of the rig frame pipeline.
///
/// Every field has a default, so partial JSON documents are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigSettings {
    /// Clamp each parameter's merged position into the unit cube.
    ///
    /// Sampling always clamps per axis; this additionally keeps the value
    /// reported by [`Parameter::position`](crate::param::Parameter::position)
    /// inside [0, 1].
    pub clamp_positions: bool,

    /// Reset every bound property to the scene graph's default before the
    /// bindings merge into it.
    ///
    /// Disable when the host resets its own offsets at frame start.
    pub reset_targets: bool,

    /// Treat a deformation vertex-count mismatch detected mid-frame as a
    /// skipped binding (reported in `FrameStats`).
    ///
    /// When `false`, the resolved field is truncated or zero-padded to the
    /// mesh's vertex count instead. The mismatch is still logged.
    pub strict_deformation: bool,
}

impl Default for RigSettings {
    #[inline]
    fn default() -> Self {
        Self {
            clamp_positions: true,
            reset_targets: true,
            strict_deformation: true,
        }
    }
}

impl RigSettings {
    /// Parses settings from a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = RigSettings::from_json(r#"{ "reset_targets": false }"#).unwrap();
        assert!(settings.clamp_positions);
        assert!(!settings.reset_targets);
        assert!(settings.strict_deformation);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(RigSettings::from_json("{ not json").is_err());
    }
}
