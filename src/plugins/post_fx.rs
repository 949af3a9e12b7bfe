use std::collections::BTreeSet;
use std::time::Duration;

use bevy::core_pipeline::bloom::BloomSettings;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;
use bevy::winit::{UpdateMode, WinitSettings};

use crate::plugins::camera::{CameraTransition, PlannerCamera};
use crate::plugins::gating::{post_processing_effect_set, PostEffect};
use crate::plugins::gpu_tier::{should_always_animate, GpuTierState};
use crate::plugins::perf_monitor::PerfMonitor;
use crate::plugins::planner_state::PlannerState;
use crate::plugins::scene::Sun;

/// Idle redraw interval when nothing animates.
pub const LOW_POWER_WAIT: Duration = Duration::from_millis(250);

/// Post-processing resolved for the current tier. Empty outside UV mode.
#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub struct ActivePostEffects(pub BTreeSet<PostEffect>);

impl ActivePostEffects {
    pub fn contains(&self, effect: PostEffect) -> bool {
        self.0.contains(&effect)
    }
}

/// Effect set for the planner flags; the composer only runs in UV mode.
pub fn resolve_post_effects(uv_mode: bool, state: &GpuTierState, has_light_source: bool) -> BTreeSet<PostEffect> {
    if !uv_mode {
        return BTreeSet::new();
    }
    post_processing_effect_set(state.effective(), has_light_source)
}

pub fn update_mode_for(always_animate: bool) -> UpdateMode {
    if always_animate {
        UpdateMode::Continuous
    } else {
        UpdateMode::reactive_low_power(LOW_POWER_WAIT)
    }
}

pub struct PostFxPlugin;
impl Plugin for PostFxPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ActivePostEffects>()
            .add_systems(PostUpdate, (resolve_active_effects, apply_camera_effects, select_render_loop).chain());
    }
}

fn resolve_active_effects(
    planner: Res<PlannerState>,
    tier: Res<GpuTierState>,
    q_sun: Query<(), With<Sun>>,
    mut active: ResMut<ActivePostEffects>,
) {
    let next = resolve_post_effects(planner.uv_mode, &tier, !q_sun.is_empty());
    if active.0 != next {
        info!("POST_FX effects={:?}", next);
        active.0 = next;
    }
}

fn apply_camera_effects(
    mut commands: Commands,
    active: Res<ActivePostEffects>,
    mut q_cam: Query<(Entity, &mut Tonemapping, Option<&BloomSettings>), With<PlannerCamera>>,
) {
    if !active.is_changed() { return; }
    for (e, mut tonemapping, bloom) in &mut q_cam {
        let want_tm = if active.contains(PostEffect::ToneMapping) { Tonemapping::TonyMcMapface } else { Tonemapping::None };
        if *tonemapping != want_tm {
            *tonemapping = want_tm;
        }
        match (active.contains(PostEffect::Bloom), bloom.is_some()) {
            (true, false) => {
                commands.entity(e).insert(BloomSettings::NATURAL);
            }
            (false, true) => {
                commands.entity(e).remove::<BloomSettings>();
            }
            _ => {}
        }
    }
}

/// Also gates frame-time sampling: reactive frames are idle waits.
fn select_render_loop(
    planner: Res<PlannerState>,
    tier: Res<GpuTierState>,
    transition: Option<Res<CameraTransition>>,
    winit: Option<ResMut<WinitSettings>>,
    perf: Option<ResMut<PerfMonitor>>,
    mut last: Local<Option<bool>>,
) {
    let moving = transition.map(|t| t.is_active()).unwrap_or(false);
    let always = should_always_animate(planner.uv_mode, tier.effective(), moving);
    if *last == Some(always) { return; }
    *last = Some(always);
    if let Some(mut winit) = winit {
        winit.focused_mode = update_mode_for(always);
        winit.unfocused_mode = update_mode_for(always);
    }
    if let Some(mut perf) = perf {
        perf.set_paused(!always);
    }
    debug!("RENDER_LOOP continuous={}", always);
}
