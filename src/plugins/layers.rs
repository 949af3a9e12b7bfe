// Layer model: independently toggleable visual groups with visibility, opacity
// and lock state. One entry per defined layer, alive for the whole session.
use bevy::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerId {
    Holes,
    FlowPath,
    Grid,
    Walls,
    SunIndicator,
    Environment,
}

pub struct LayerDefinition {
    pub id: LayerId,
    pub label: &'static str,
    pub icon: &'static str,
}

/// Display order for panels.
pub const LAYER_DEFINITIONS: [LayerDefinition; 6] = [
    LayerDefinition { id: LayerId::Holes, label: "Holes", icon: "⛳" },
    LayerDefinition { id: LayerId::FlowPath, label: "Flow Path", icon: "↝" },
    LayerDefinition { id: LayerId::Grid, label: "Grid", icon: "#" },
    LayerDefinition { id: LayerId::Walls, label: "Walls", icon: "▯" },
    LayerDefinition { id: LayerId::SunIndicator, label: "Sun", icon: "☀" },
    LayerDefinition { id: LayerId::Environment, label: "Environment", icon: "◍" },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerState {
    pub visible: bool,
    pub opacity: f32,
    pub locked: bool,
}

impl Default for LayerState {
    fn default() -> Self {
        Self { visible: true, opacity: 1.0, locked: false }
    }
}

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct LayerStates {
    layers: BTreeMap<LayerId, LayerState>,
}

impl Default for LayerStates {
    fn default() -> Self {
        Self { layers: LAYER_DEFINITIONS.iter().map(|d| (d.id, LayerState::default())).collect() }
    }
}

impl LayerStates {
    pub fn get(&self, id: LayerId) -> LayerState {
        self.layers.get(&id).copied().unwrap_or_default()
    }

    fn entry(&mut self, id: LayerId) -> &mut LayerState {
        self.layers.entry(id).or_default()
    }

    pub fn toggle_visible(&mut self, id: LayerId) {
        let l = self.entry(id);
        l.visible = !l.visible;
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) {
        self.entry(id).visible = visible;
    }

    /// Clamped into `[0, 1]`; NaN is ignored.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) {
        if opacity.is_nan() { return; }
        self.entry(id).opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn toggle_locked(&mut self, id: LayerId) {
        let l = self.entry(id);
        l.locked = !l.locked;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerId, LayerState)> + '_ {
        self.layers.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Root of a layer's entity hierarchy.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRoot(pub LayerId);

pub struct LayersPlugin;
impl Plugin for LayersPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LayerStates>()
            .add_systems(Update, sync_layer_visibility);
    }
}

fn sync_layer_visibility(
    layers: Res<LayerStates>,
    mut q_roots: Query<(Ref<LayerRoot>, &mut Visibility)>,
) {
    for (root, mut vis) in &mut q_roots {
        if !layers.is_changed() && !root.is_added() { continue; }
        let want = if layers.get(root.0).visible { Visibility::Inherited } else { Visibility::Hidden };
        if *vis != want {
            *vis = want;
        }
    }
}
