use bevy::prelude::*;

use crate::plugins::camera::{CameraPreset, CameraPresetRequest};
use crate::plugins::config::ForgeConfig;
use crate::plugins::gating::ViewMode;
use crate::plugins::gpu_tier::GpuTierState;
use crate::plugins::layers::{LayerId, LayerStates};
use crate::plugins::storage::PreferenceStore;

/// Planner-wide view flags read by every rendering subsystem.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlannerState {
    pub view: ViewMode,
    pub uv_mode: bool,
}

impl PlannerState {
    pub fn from_config(config: &ForgeConfig) -> Self {
        Self { view: config.initial_view, uv_mode: config.initial_uv_mode }
    }
}

pub const GRID_OPACITY_STEP: f32 = 0.1;

const LAYER_KEYS: [(KeyCode, LayerId); 6] = [
    (KeyCode::KeyG, LayerId::Grid),
    (KeyCode::KeyH, LayerId::Holes),
    (KeyCode::KeyW, LayerId::Walls),
    (KeyCode::KeyE, LayerId::Environment),
    (KeyCode::KeyF, LayerId::FlowPath),
    (KeyCode::KeyS, LayerId::SunIndicator),
];

const PRESET_KEYS: [KeyCode; 7] = [
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
];

pub struct PlannerStatePlugin;
impl Plugin for PlannerStatePlugin {
    fn build(&self, app: &mut App) {
        let initial = app
            .world()
            .get_resource::<ForgeConfig>()
            .map(PlannerState::from_config)
            .unwrap_or_default();
        app.insert_resource(initial)
            .add_systems(Update, (view_keys, tier_keys, layer_keys));
    }
}

fn view_keys(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut state: ResMut<PlannerState>,
    mut ev_preset: EventWriter<CameraPresetRequest>,
) {
    let Some(keys) = keys else { return; };
    if keys.just_pressed(KeyCode::KeyV) {
        state.view = state.view.toggled();
    }
    if keys.just_pressed(KeyCode::KeyU) {
        state.uv_mode = !state.uv_mode;
        info!("PLANNER uv_mode={}", state.uv_mode);
    }
    for (key, preset) in PRESET_KEYS.iter().zip(CameraPreset::ALL) {
        if keys.just_pressed(*key) {
            ev_preset.send(CameraPresetRequest(preset));
        }
    }
}

fn tier_keys(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut tier: ResMut<GpuTierState>,
    store: Option<ResMut<PreferenceStore>>,
) {
    let Some(keys) = keys else { return; };
    if !keys.just_pressed(KeyCode::KeyT) { return; }
    let next = tier.tier_override.next();
    match store {
        Some(mut store) => tier.set_override(next, &mut store),
        None => tier.set_override(next, &mut PreferenceStore::memory()),
    }
}

fn layer_keys(keys: Option<Res<ButtonInput<KeyCode>>>, mut layers: ResMut<LayerStates>) {
    let Some(keys) = keys else { return; };
    for (key, id) in LAYER_KEYS {
        if keys.just_pressed(key) {
            layers.toggle_visible(id);
        }
    }
    let grid = layers.get(LayerId::Grid).opacity;
    if keys.just_pressed(KeyCode::BracketLeft) {
        layers.set_opacity(LayerId::Grid, grid - GRID_OPACITY_STEP);
    }
    if keys.just_pressed(KeyCode::BracketRight) {
        layers.set_opacity(LayerId::Grid, grid + GRID_OPACITY_STEP);
    }
    if keys.just_pressed(KeyCode::KeyR) {
        layers.reset();
        info!("LAYERS reset");
    }
}
