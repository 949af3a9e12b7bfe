use bevy::prelude::*;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};

use crate::plugins::config::ForgeConfig;
use crate::plugins::gating::ViewMode;
use crate::plugins::planner_state::PlannerState;

/// Marker plus zoom scalar for the single planner camera. `zoom` is pixels per
/// metre in plan view; the 3D view scales its orbit distance by the same value.
#[derive(Component, Debug, Clone, Copy)]
pub struct PlannerCamera {
    pub zoom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraPreset {
    Top,
    Front,
    Back,
    Left,
    Right,
    Isometric,
    Overview,
}

impl CameraPreset {
    /// Keyboard order for the number row.
    pub const ALL: [CameraPreset; 7] = [
        CameraPreset::Top,
        CameraPreset::Front,
        CameraPreset::Back,
        CameraPreset::Left,
        CameraPreset::Right,
        CameraPreset::Isometric,
        CameraPreset::Overview,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPresetConfig {
    pub position: Vec3,
    pub target: Vec3,
}

/// Preset poses for a hall spanning `[0, width] x [0, length]` on the floor.
pub fn camera_preset(preset: CameraPreset, hall_width: f32, hall_length: f32) -> CameraPresetConfig {
    let w = hall_width.max(0.0);
    let l = hall_length.max(0.0);
    let center = Vec3::new(w * 0.5, 0.0, l * 0.5);
    let span = w.max(l);
    let position = match preset {
        // Small z offset keeps look_at away from the degenerate straight-down case.
        CameraPreset::Top => Vec3::new(center.x, span * 1.5, center.z + 0.01),
        CameraPreset::Front => Vec3::new(center.x, span * 0.4, l + span * 0.8),
        CameraPreset::Back => Vec3::new(center.x, span * 0.4, -span * 0.8),
        CameraPreset::Left => Vec3::new(-span * 0.8, span * 0.4, center.z),
        CameraPreset::Right => Vec3::new(w + span * 0.8, span * 0.4, center.z),
        CameraPreset::Isometric => Vec3::new(w + span * 0.6, span * 0.8, l + span * 0.6),
        CameraPreset::Overview => Vec3::new(center.x, span * 1.2, l + span * 0.9),
    };
    CameraPresetConfig { position, target: center }
}

#[derive(Event, Debug, Clone, Copy)]
pub struct CameraPresetRequest(pub CameraPreset);

/// Current orbit pose; `position` is the pose at the configured reference zoom.
#[derive(Resource, Debug, Clone, Copy)]
pub struct CameraRig {
    pub pose: CameraPresetConfig,
    pub reference_zoom: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
}

impl CameraRig {
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        if zoom.is_nan() { return self.reference_zoom; }
        zoom.clamp(self.zoom_min, self.zoom_max)
    }

    /// Eye position for a zoom value: closer as zoom grows.
    pub fn eye_for_zoom(&self, zoom: f32) -> Vec3 {
        let offset = self.pose.position - self.pose.target;
        self.pose.target + offset * (self.reference_zoom / zoom.max(f32::EPSILON))
    }
}

/// Eased move between two poses. `is_active` feeds the render-loop decision.
#[derive(Resource, Debug, Default)]
pub struct CameraTransition {
    active: Option<TransitionLeg>,
}

#[derive(Debug, Clone, Copy)]
struct TransitionLeg {
    from: CameraPresetConfig,
    to: CameraPresetConfig,
    elapsed: f32,
    duration: f32,
}

impl CameraTransition {
    pub const DURATION: f32 = 0.6;

    pub fn start(&mut self, from: CameraPresetConfig, to: CameraPresetConfig) {
        self.active = Some(TransitionLeg { from, to, elapsed: 0.0, duration: Self::DURATION });
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Advances by `dt` seconds and returns the interpolated pose. The final
    /// step lands exactly on the destination and ends the transition.
    pub fn advance(&mut self, dt: f32) -> Option<CameraPresetConfig> {
        let leg = self.active.as_mut()?;
        leg.elapsed += dt.max(0.0);
        let t = (leg.elapsed / leg.duration).min(1.0);
        let e = t * t * (3.0 - 2.0 * t);
        let pose = CameraPresetConfig {
            position: leg.from.position.lerp(leg.to.position, e),
            target: leg.from.target.lerp(leg.to.target, e),
        };
        if t >= 1.0 {
            self.active = None;
        }
        Some(pose)
    }
}

pub fn projection_for_view(view: ViewMode, zoom: f32) -> Projection {
    match view {
        ViewMode::Top => Projection::Orthographic(OrthographicProjection {
            scale: 1.0 / zoom.max(f32::EPSILON),
            near: -1000.0,
            far: 1000.0,
            ..default()
        }),
        ViewMode::ThreeD => Projection::Perspective(PerspectiveProjection::default()),
    }
}

pub struct CameraPlugin;
impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        let (w, l, zoom, zmin, zmax, view) = match app.world().get_resource::<ForgeConfig>() {
            Some(c) => (c.hall.width, c.hall.length, c.initial_zoom, c.zoom_min, c.zoom_max, c.initial_view),
            None => {
                let c = ForgeConfig::default();
                (c.hall.width, c.hall.length, c.initial_zoom, c.zoom_min, c.zoom_max, c.initial_view)
            }
        };
        let preset = if view.is_top_down() { CameraPreset::Top } else { CameraPreset::Isometric };
        app.insert_resource(CameraRig {
            pose: camera_preset(preset, w, l),
            reference_zoom: zoom,
            zoom_min: zmin,
            zoom_max: zmax,
        })
        .init_resource::<CameraTransition>()
        .add_event::<CameraPresetRequest>()
        .add_systems(Startup, spawn_planner_camera)
        .add_systems(Update, (
            wheel_zoom,
            follow_view_mode,
            handle_preset_requests,
            apply_camera_rig,
        ).chain());
    }
}

fn spawn_planner_camera(mut commands: Commands, rig: Res<CameraRig>, state: Option<Res<PlannerState>>) {
    let view = state.map(|s| s.view).unwrap_or_default();
    let zoom = rig.reference_zoom;
    commands.spawn((
        Camera3dBundle {
            camera: Camera { hdr: true, ..default() },
            projection: projection_for_view(view, zoom),
            transform: Transform::from_translation(rig.eye_for_zoom(zoom)).looking_at(rig.pose.target, Vec3::Y),
            ..default()
        },
        PlannerCamera { zoom },
        Name::new("PlannerCamera"),
    ));
}

fn wheel_zoom(
    mut ev_wheel: EventReader<MouseWheel>,
    rig: Res<CameraRig>,
    mut q_cam: Query<&mut PlannerCamera>,
) {
    let Ok(mut cam) = q_cam.get_single_mut() else { ev_wheel.clear(); return; };
    for w in ev_wheel.read() {
        let steps = match w.unit {
            MouseScrollUnit::Line => w.y,
            MouseScrollUnit::Pixel => w.y / 40.0,
        };
        let next = rig.clamp_zoom(cam.zoom * 1.1f32.powf(steps));
        if next != cam.zoom {
            cam.zoom = next;
        }
    }
}

fn handle_preset_requests(
    mut ev: EventReader<CameraPresetRequest>,
    config: Option<Res<ForgeConfig>>,
    mut rig: ResMut<CameraRig>,
    mut transition: ResMut<CameraTransition>,
) {
    let Some(CameraPresetRequest(preset)) = ev.read().last().copied() else { return; };
    let (w, l) = config.map(|c| (c.hall.width, c.hall.length)).unwrap_or((10.0, 20.0));
    let to = camera_preset(preset, w, l);
    transition.start(rig.pose, to);
    rig.pose = to;
    debug!("CAMERA preset={:?}", preset);
}

/// Swaps projection on view-mode change and snaps the pose to the matching preset.
fn follow_view_mode(
    state: Option<Res<PlannerState>>,
    mut last: Local<Option<ViewMode>>,
    mut ev_preset: EventWriter<CameraPresetRequest>,
    mut q_cam: Query<(&PlannerCamera, &mut Projection)>,
) {
    let Some(state) = state else { return; };
    if *last == Some(state.view) { return; }
    let first = last.is_none();
    *last = Some(state.view);
    if first { return; }
    let Ok((cam, mut projection)) = q_cam.get_single_mut() else { return; };
    *projection = projection_for_view(state.view, cam.zoom);
    ev_preset.send(CameraPresetRequest(if state.view.is_top_down() {
        CameraPreset::Top
    } else {
        CameraPreset::Isometric
    }));
    info!("CAMERA view={:?}", state.view);
}

fn apply_camera_rig(
    time: Res<Time>,
    rig: Res<CameraRig>,
    mut transition: ResMut<CameraTransition>,
    mut q_cam: Query<(Ref<PlannerCamera>, &mut Transform, &mut Projection)>,
) {
    let Ok((cam, mut tf, mut projection)) = q_cam.get_single_mut() else { return; };
    let moving = transition.is_active();
    let pose = transition.advance(time.delta_seconds()).unwrap_or(rig.pose);
    if !moving && !cam.is_changed() && !rig.is_changed() { return; }
    let scaled = CameraRig { pose, ..*rig };
    *tf = Transform::from_translation(scaled.eye_for_zoom(cam.zoom)).looking_at(pose.target, Vec3::Y);
    if let Projection::Orthographic(ortho) = projection.as_mut() {
        ortho.scale = 1.0 / cam.zoom.max(f32::EPSILON);
    }
}
