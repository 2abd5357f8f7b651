//! The rig root.
//!
//! [`Rig`] owns every parameter of a puppet and drives the per-frame pipeline.
//! All state lives here and is dropped with the rig.
//!
//! # Frame order
//!
//! ```text
//! begin_frame()            positions <- base, offsets cleared
//! push_offset(..) * N      producers (timeline, physics, automation)
//! apply(&mut scene)        targets reset, bindings resolve + merge
//! ```
//!
//! [`Rig::update`] runs all three steps with a list of [`OffsetProducer`]s.
//!
//! # Merge order
//!
//! Bindings merge into node properties in creation order across all
//! parameters. Two bindings driving the same property therefore combine
//! deterministically: e.g. `Forced` then `Additive` yields `forced + added`,
//! while `Additive` then `Forced` yields `forced`.

use glam::Vec2;
use slotmap::{SlotMap, new_key_type};

use crate::errors::{Result, RigError};
use crate::param::binding::{
    Binding, BindingId, BindingTarget, DEFORM_KEY, DeformationBinding, ValueBinding,
};
use crate::param::merge::MergeMode;
use crate::param::parameter::{Parameter, ParameterId, Resolved};
use crate::rig::target::{NodeId, PropertyTarget};
use crate::settings::RigSettings;

new_key_type! {
    pub struct ParameterKey;
}

/// Counters for one [`Rig::apply`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Bindings resolved and merged.
    pub resolved: usize,
    /// Bindings skipped because of a contract violation.
    pub skipped: usize,
    /// Dense grids rebuilt during this pass.
    pub rebuilt: usize,
}

/// Anything that pushes parameter offsets once per frame: timeline
/// animation, physics drivers, procedural automation.
pub trait OffsetProducer {
    fn produce(&mut self, dt: f32, rig: &mut Rig);
}

/// Root of a puppet's parameters and bindings.
#[derive(Debug, Default)]
pub struct Rig {
    settings: RigSettings,
    parameters: SlotMap<ParameterKey, Parameter>,
    order: Vec<(BindingId, ParameterKey)>,
    next_binding: u64,
    next_parameter: u32,
}

impl Rig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(settings: RigSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RigSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RigSettings {
        &mut self.settings
    }

    fn allocate_binding(&mut self) -> BindingId {
        self.next_binding += 1;
        BindingId(self.next_binding)
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Adds a parameter. Its id is kept unless it is zero or already taken;
    /// any bindings it carries are registered after the existing ones.
    pub fn add_parameter(&mut self, mut parameter: Parameter) -> ParameterKey {
        let id = parameter.id();
        let taken = self.parameters.values().any(|p| p.id() == id);
        if id.0 == 0 || taken {
            self.next_parameter += 1;
            parameter.set_id(ParameterId(self.next_parameter));
        } else {
            self.next_parameter = self.next_parameter.max(id.0);
        }

        let mut fresh = Vec::with_capacity(parameter.bindings().len());
        for binding in parameter.bindings_mut() {
            let id = self.allocate_binding();
            binding.set_id(id);
            fresh.push(id);
        }

        let key = self.parameters.insert(parameter);
        self.order.extend(fresh.into_iter().map(|id| (id, key)));
        key
    }

    /// Removes a parameter together with its bindings.
    pub fn remove_parameter(&mut self, key: ParameterKey) -> Option<Parameter> {
        let parameter = self.parameters.remove(key)?;
        self.order.retain(|&(_, k)| k != key);
        Some(parameter)
    }

    #[inline]
    #[must_use]
    pub fn parameter(&self, key: ParameterKey) -> Option<&Parameter> {
        self.parameters.get(key)
    }

    #[inline]
    pub fn parameter_mut(&mut self, key: ParameterKey) -> Option<&mut Parameter> {
        self.parameters.get_mut(key)
    }

    /// Finds a parameter by name.
    #[must_use]
    pub fn find_parameter(&self, name: &str) -> Option<ParameterKey> {
        self.parameters
            .iter()
            .find_map(|(key, p)| (p.name() == name).then_some(key))
    }

    /// Finds a parameter by its persistent id.
    #[must_use]
    pub fn find_parameter_by_id(&self, id: ParameterId) -> Option<ParameterKey> {
        self.parameters
            .iter()
            .find_map(|(key, p)| (p.id() == id).then_some(key))
    }

    pub fn parameters(&self) -> impl Iterator<Item = (ParameterKey, &Parameter)> {
        self.parameters.iter()
    }

    #[inline]
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Binds a scalar property of `node` to a parameter.
    ///
    /// Returns the existing binding if the property is already bound to this
    /// parameter. The mesh key `deform` belongs to [`Rig::bind_deformation`].
    pub fn bind_value<P: PropertyTarget + ?Sized>(
        &mut self,
        key: ParameterKey,
        scene: &P,
        node: NodeId,
        property: &str,
        mode: MergeMode,
    ) -> Result<BindingId> {
        if property == DEFORM_KEY {
            return Err(RigError::KindMismatch {
                expected: "value",
                found: "deformation",
            });
        }
        if !scene.has_property(node, property) {
            return Err(RigError::UnknownProperty {
                node,
                key: property.to_owned(),
            });
        }

        let target = BindingTarget::new(node, property);
        let parameter = self.parameters.get(key).ok_or(RigError::UnknownParameter)?;
        if let Some(existing) = parameter.binding_for(&target) {
            return Ok(existing.id());
        }
        let dims = parameter.axes().grid_dims();
        log::debug!("Binding {target} to parameter `{}`", parameter.name());

        let id = self.allocate_binding();
        self.register(key, Binding::Value(ValueBinding::new(id, target, mode, dims)));
        Ok(id)
    }

    /// Binds the mesh of `node` to a parameter as a deformation.
    ///
    /// The binding is sized to the mesh's current vertex count. An existing
    /// deformation binding for the node is resized to it and returned.
    pub fn bind_deformation<P: PropertyTarget + ?Sized>(
        &mut self,
        key: ParameterKey,
        scene: &P,
        node: NodeId,
        mode: MergeMode,
    ) -> Result<BindingId> {
        let vertex_count = scene.vertex_count(node).ok_or(RigError::MissingMesh(node))?;

        let target = BindingTarget::new(node, DEFORM_KEY);
        let parameter = self.parameters.get_mut(key).ok_or(RigError::UnknownParameter)?;
        if let Some(existing) = parameter.binding_for(&target).map(Binding::id) {
            let binding = parameter
                .binding_mut(existing)
                .ok_or(RigError::UnknownBinding(existing.0))?;
            let found = binding.kind_name();
            binding
                .as_deformation_mut()
                .ok_or(RigError::KindMismatch {
                    expected: "deformation",
                    found,
                })?
                .resize_vertices(vertex_count);
            return Ok(existing);
        }
        let dims = parameter.axes().grid_dims();

        let id = self.allocate_binding();
        log::debug!("Binding {target} ({vertex_count} vertices) as {id}");
        let binding =
            Binding::Deformation(DeformationBinding::new(id, node, mode, dims, vertex_count));
        self.register(key, binding);
        Ok(id)
    }

    /// Attaches a detached binding under a fresh id, after every existing
    /// binding in merge order.
    pub(crate) fn adopt(&mut self, key: ParameterKey, mut binding: Binding) -> Result<BindingId> {
        if !self.parameters.contains_key(key) {
            return Err(RigError::UnknownParameter);
        }
        let id = self.allocate_binding();
        binding.set_id(id);
        self.register(key, binding);
        Ok(id)
    }

    /// Attaches a freshly allocated binding and appends it to the merge order.
    fn register(&mut self, key: ParameterKey, binding: Binding) {
        let id = binding.id();
        if let Some(parameter) = self.parameters.get_mut(key) {
            parameter.attach(binding);
            self.order.push((id, key));
        }
    }

    #[must_use]
    pub fn binding(&self, key: ParameterKey, id: BindingId) -> Option<&Binding> {
        self.parameters.get(key)?.binding(id)
    }

    pub fn binding_mut(&mut self, key: ParameterKey, id: BindingId) -> Option<&mut Binding> {
        self.parameters.get_mut(key)?.binding_mut(id)
    }

    /// Scalar binding for authoring.
    pub fn value_binding_mut(
        &mut self,
        key: ParameterKey,
        id: BindingId,
    ) -> Result<&mut ValueBinding> {
        let binding = self.binding_mut(key, id).ok_or(RigError::UnknownBinding(id.0))?;
        let found = binding.kind_name();
        binding.as_value_mut().ok_or(RigError::KindMismatch {
            expected: "value",
            found,
        })
    }

    /// Deformation binding for authoring.
    pub fn deformation_binding_mut(
        &mut self,
        key: ParameterKey,
        id: BindingId,
    ) -> Result<&mut DeformationBinding> {
        let binding = self.binding_mut(key, id).ok_or(RigError::UnknownBinding(id.0))?;
        let found = binding.kind_name();
        binding.as_deformation_mut().ok_or(RigError::KindMismatch {
            expected: "deformation",
            found,
        })
    }

    /// Removes one binding.
    pub fn unbind(&mut self, key: ParameterKey, id: BindingId) -> Option<Binding> {
        let binding = self.parameters.get_mut(key)?.detach(id)?;
        self.order.retain(|&(i, _)| i != id);
        Some(binding)
    }

    /// Destroys every binding targeting `node`. Returns how many went away.
    pub fn remove_node(&mut self, node: NodeId) -> usize {
        let mut removed = Vec::new();
        for parameter in self.parameters.values_mut() {
            removed.extend(parameter.detach_where(|b| b.target().node == node));
        }
        self.order.retain(|(id, _)| !removed.contains(id));
        removed.len()
    }

    /// Bindings in merge order.
    pub fn bindings(&self) -> impl Iterator<Item = (ParameterKey, &Binding)> {
        self.order.iter().filter_map(|&(id, key)| {
            let binding = self.parameters.get(key)?.binding(id)?;
            Some((key, binding))
        })
    }

    // ========================================================================
    // Frame pipeline
    // ========================================================================

    /// Step 1: every parameter returns to its base position.
    pub fn begin_frame(&mut self) {
        for parameter in self.parameters.values_mut() {
            parameter.begin_frame();
        }
    }

    /// Step 2: pushes an offset onto a parameter's full position.
    pub fn push_offset(&mut self, key: ParameterKey, value: Vec2, mode: MergeMode) -> Result<()> {
        self.parameters
            .get_mut(key)
            .ok_or(RigError::UnknownParameter)?
            .push_offset(value, mode);
        Ok(())
    }

    /// Step 2: pushes an offset onto one axis of a parameter.
    pub fn push_axis_offset(
        &mut self,
        key: ParameterKey,
        axis: usize,
        value: f32,
        mode: MergeMode,
    ) -> Result<()> {
        self.parameters
            .get_mut(key)
            .ok_or(RigError::UnknownParameter)?
            .push_axis_offset(axis, value, mode)
    }

    /// Step 3: resolves every binding at its parameter's position and merges
    /// the result into the scene, in creation order.
    ///
    /// A failing binding is logged and skipped; the rest of the rig updates.
    pub fn apply<P: PropertyTarget + ?Sized>(&mut self, scene: &mut P) -> FrameStats {
        if self.settings.clamp_positions {
            for parameter in self.parameters.values_mut() {
                parameter.clamp_position();
            }
        }
        if self.settings.reset_targets {
            self.reset_targets(scene);
        }

        let strict = self.settings.strict_deformation;
        let mut stats = FrameStats::default();
        for &(id, key) in &self.order {
            let Some(parameter) = self.parameters.get(key) else {
                continue;
            };
            let Some(binding) = parameter.binding(id) else {
                continue;
            };
            match merge_binding(parameter, binding, scene, strict) {
                Ok(rebuilt) => {
                    stats.resolved += 1;
                    stats.rebuilt += usize::from(rebuilt);
                }
                Err(err) => {
                    log::error!("Skipping binding {id} ({}): {err}", binding.target());
                    stats.skipped += 1;
                }
            }
        }
        stats
    }

    /// Runs a whole frame: reset, producers, resolve/merge.
    pub fn update<P: PropertyTarget + ?Sized>(
        &mut self,
        dt: f32,
        producers: &mut [&mut dyn OffsetProducer],
        scene: &mut P,
    ) -> FrameStats {
        self.begin_frame();
        for producer in producers.iter_mut() {
            producer.produce(dt, self);
        }
        self.apply(scene)
    }

    fn reset_targets<P: PropertyTarget + ?Sized>(&self, scene: &mut P) {
        for (_, binding) in self.bindings() {
            let BindingTarget { node, key } = binding.target();
            match binding {
                Binding::Value(_) => {
                    if scene.has_property(*node, key) {
                        let neutral = scene.default_value(*node, key);
                        scene.set_offset(*node, key, neutral);
                    }
                }
                Binding::Deformation(_) => scene.reset_deformation(*node),
            }
        }
    }
}

/// Resolves one binding and merges it into the scene. Returns whether the
/// dense grid was rebuilt.
fn merge_binding<P: PropertyTarget + ?Sized>(
    parameter: &Parameter,
    binding: &Binding,
    scene: &mut P,
    strict: bool,
) -> Result<bool> {
    let BindingTarget { node, key } = binding.target();
    let node = *node;
    let mode = binding.mode();

    match binding {
        Binding::Value(_) => {
            let current = scene
                .offset(node, key)
                .ok_or_else(|| RigError::UnknownProperty {
                    node,
                    key: key.clone(),
                })?;
            let (resolved, rebuilt) = parameter.sample_tracked(binding, parameter.position());
            if let Resolved::Value(value) = resolved {
                scene.set_offset(node, key, mode.merge(current, value));
            }
            Ok(rebuilt)
        }
        Binding::Deformation(deform) => {
            let mesh = scene.vertex_count(node).ok_or(RigError::MissingMesh(node))?;
            if mesh != deform.vertex_count() {
                let err = RigError::VertexCountMismatch {
                    node,
                    mesh,
                    binding: deform.vertex_count(),
                };
                if strict {
                    return Err(err);
                }
                log::warn!("{err}; fitting resolved field to the mesh");
            }

            let (resolved, rebuilt) = parameter.sample_tracked(binding, parameter.position());
            if let Resolved::Deformation(mut field) = resolved {
                field.resize(mesh);
                let buffer = scene
                    .deformation_mut(node)
                    .ok_or(RigError::MissingMesh(node))?;
                mode.merge_field(buffer, &field.offsets);
            }
            Ok(rebuilt)
        }
    }
}
