//! Rig persistence.
//!
//! Descriptors are plain serde data, independent of any live [`Rig`]: a
//! [`RigDesc`] lists parameters, each with its bindings. Binding tables are
//! indexed `[x][y]` and carry an explicit-cell mask next to the values.
//!
//! Only explicit cells survive a load. Everything else is re-derived by the
//! reconstructor the first time a binding resolves, so edits made by other
//! tools to inferred cells are ignored. Tables whose shape disagrees with the
//! parameter's axes are fitted to it (out-of-range cells dropped, missing
//! cells unset) and a warning is logged.
//!
//! ```json
//! {
//!   "version": 1,
//!   "parameters": [{
//!     "id": 3,
//!     "name": "head_yaw",
//!     "axis_points": [[0.0, 0.5, 1.0]],
//!     "bindings": [{
//!       "kind": "value",
//!       "node": 12,
//!       "key": "transform.t.x",
//!       "values": [[-30.0], [0.0], [30.0]],
//!       "is_set": [[true], [false], [true]],
//!       "merge_mode": "Additive"
//!     }]
//!   }]
//! }
//! ```

use glam::Vec2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, RigError};
use crate::param::axis::AxisSpace;
use crate::param::binding::{
    Binding, BindingId, BindingTarget, DEFORM_KEY, DeformationBinding, ValueBinding,
};
use crate::param::grid::Grid;
use crate::param::merge::MergeMode;
use crate::param::parameter::{Parameter, ParameterId};
use crate::param::values::Deformation;
use crate::rig::{NodeId, ParameterKey, Rig};

const FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    FORMAT_VERSION
}

fn default_max() -> Vec2 {
    Vec2::ONE
}

/// Serialized rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigDesc {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub parameters: Vec<ParameterDesc>,
}

/// Serialized parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDesc {
    #[serde(default)]
    pub id: ParameterId,
    pub name: String,
    /// Breakpoints per axis; one list for a line, two for a plane.
    pub axis_points: Vec<Vec<f32>>,
    #[serde(default)]
    pub min: Vec2,
    #[serde(default = "default_max")]
    pub max: Vec2,
    #[serde(default)]
    pub base: Vec2,
    #[serde(default)]
    pub bindings: Vec<BindingDesc>,
}

/// Serialized binding.
///
/// `order` is the binding's position in the rig-wide merge order. Bindings
/// without one load after all ordered bindings, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingDesc {
    Value {
        node: NodeId,
        key: String,
        values: Vec<Vec<f32>>,
        is_set: Vec<Vec<bool>>,
        #[serde(default)]
        merge_mode: MergeMode,
        #[serde(default)]
        order: Option<u64>,
    },
    Deformation {
        node: NodeId,
        #[serde(default)]
        vertex_count: Option<usize>,
        values: Vec<Vec<Deformation>>,
        is_set: Vec<Vec<bool>>,
        #[serde(default)]
        merge_mode: MergeMode,
        #[serde(default)]
        order: Option<u64>,
    },
}

impl BindingDesc {
    fn order(&self) -> Option<u64> {
        match self {
            Self::Value { order, .. } | Self::Deformation { order, .. } => *order,
        }
    }
}

// ============================================================================
// Save
// ============================================================================

fn table<T: Clone>(grid: &Grid<T>) -> (Vec<Vec<T>>, Vec<Vec<bool>>) {
    let [width, height] = grid.dims();
    let values = grid.values();
    let mask = grid.explicit_mask();
    let column = |x: usize| x * height..(x + 1) * height;
    (
        (0..width).map(|x| values[column(x)].to_vec()).collect(),
        (0..width).map(|x| mask[column(x)].to_vec()).collect(),
    )
}

fn describe_binding(binding: &Binding, order: Option<u64>) -> BindingDesc {
    match binding {
        Binding::Value(b) => {
            let (values, is_set) = table(b.cells().grid());
            BindingDesc::Value {
                node: b.target().node,
                key: b.target().key.clone(),
                values,
                is_set,
                merge_mode: binding.mode(),
                order,
            }
        }
        Binding::Deformation(b) => {
            let (values, is_set) = table(b.cells().grid());
            BindingDesc::Deformation {
                node: b.target().node,
                vertex_count: Some(b.vertex_count()),
                values,
                is_set,
                merge_mode: binding.mode(),
                order,
            }
        }
    }
}

// ============================================================================
// Load
// ============================================================================

/// Calls `set` for every explicit cell of a stored table that fits `dims`.
fn for_each_explicit<T>(
    target: &BindingTarget,
    dims: [usize; 2],
    values: &[Vec<T>],
    is_set: &[Vec<bool>],
    mut set: impl FnMut(usize, usize, &T) -> Result<()>,
) -> Result<()> {
    let stored = [values.len(), values.first().map_or(0, Vec::len)];
    if stored != dims {
        log::warn!("Binding {target}: stored table {stored:?} does not match axes {dims:?}, fitting");
    }

    for (x, column) in values.iter().enumerate() {
        for (y, value) in column.iter().enumerate() {
            let explicit = is_set.get(x).and_then(|c| c.get(y)).copied().unwrap_or(false);
            if explicit && x < dims[0] && y < dims[1] {
                set(x, y, value)?;
            }
        }
    }
    Ok(())
}

fn load_binding(desc: &BindingDesc, dims: [usize; 2]) -> Result<Binding> {
    // Real ids are assigned when the rig adopts the binding.
    let placeholder = BindingId(0);

    match desc {
        BindingDesc::Value {
            node,
            key,
            values,
            is_set,
            merge_mode,
            ..
        } => {
            if key == DEFORM_KEY {
                return Err(RigError::KindMismatch {
                    expected: "value",
                    found: "deformation",
                });
            }
            let target = BindingTarget::new(*node, key.as_str());
            let mut binding = ValueBinding::new(placeholder, target.clone(), *merge_mode, dims);
            for_each_explicit(&target, dims, values, is_set, |x, y, v| {
                binding.set_value(x, y, *v)
            })?;
            Ok(Binding::Value(binding))
        }
        BindingDesc::Deformation {
            node,
            vertex_count,
            values,
            is_set,
            merge_mode,
            ..
        } => {
            let vertex_count = vertex_count
                .or_else(|| {
                    values
                        .iter()
                        .zip(is_set)
                        .flat_map(|(v, m)| v.iter().zip(m))
                        .find_map(|(d, &set)| set.then(|| d.vertex_count()))
                })
                .unwrap_or(0);

            let mut binding =
                DeformationBinding::new(placeholder, *node, *merge_mode, dims, vertex_count);
            let target = binding.target().clone();
            for_each_explicit(&target, dims, values, is_set, |x, y, field| {
                let mut field = field.clone();
                if field.vertex_count() != vertex_count {
                    log::warn!(
                        "Binding {target}: cell ({x}, {y}) has {} vertices, expected {vertex_count}",
                        field.vertex_count()
                    );
                    field.resize(vertex_count);
                }
                binding.set_value(x, y, field)
            })?;
            Ok(Binding::Deformation(binding))
        }
    }
}

impl Rig {
    /// Captures every parameter and binding.
    #[must_use]
    pub fn to_desc(&self) -> RigDesc {
        let ranks: FxHashMap<BindingId, u64> = self
            .bindings()
            .enumerate()
            .map(|(rank, (_, b))| (b.id(), rank as u64))
            .collect();

        let mut parameters: Vec<ParameterDesc> = self
            .parameters()
            .map(|(_, p)| {
                let (min, max) = p.range();
                ParameterDesc {
                    id: p.id(),
                    name: p.name().to_owned(),
                    axis_points: p.axes().to_vecs(),
                    min,
                    max,
                    base: p.base(),
                    bindings: p
                        .bindings()
                        .iter()
                        .map(|b| describe_binding(b, ranks.get(&b.id()).copied()))
                        .collect(),
                }
            })
            .collect();
        parameters.sort_by_key(|p| p.id);

        RigDesc {
            version: FORMAT_VERSION,
            parameters,
        }
    }

    /// Rebuilds a rig from a descriptor, with default settings.
    ///
    /// Malformed axis points fail the whole load; binding tables are fitted.
    pub fn from_desc(desc: &RigDesc) -> Result<Self> {
        if desc.version != FORMAT_VERSION {
            log::warn!(
                "Rig format version {} (expected {FORMAT_VERSION}), loading anyway",
                desc.version
            );
        }

        let mut rig = Rig::new();
        let mut pending: Vec<(Option<u64>, ParameterKey, Binding)> = Vec::new();

        for param in &desc.parameters {
            let axes = AxisSpace::new(param.axis_points.clone())?;
            let dims = axes.grid_dims();
            let mut parameter = Parameter::new(param.name.as_str(), axes);
            parameter.set_id(param.id);
            parameter.set_range(param.min, param.max);
            parameter.set_base(param.base);
            let key = rig.add_parameter(parameter);

            for binding in &param.bindings {
                pending.push((binding.order(), key, load_binding(binding, dims)?));
            }
        }

        // None sorts first for Option, so map it past every explicit rank.
        pending.sort_by_key(|(order, _, _)| order.unwrap_or(u64::MAX));
        for (_, key, binding) in pending {
            rig.adopt(key, binding)?;
        }

        log::debug!(
            "Loaded rig: {} parameters, {} bindings",
            rig.parameter_count(),
            rig.bindings().count()
        );
        Ok(rig)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_desc())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let desc: RigDesc = serde_json::from_str(json)?;
        Self::from_desc(&desc)
    }
}
