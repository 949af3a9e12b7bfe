use bevy::prelude::*;
use bevy::render::mesh::PrimitiveTopology;
use bevy::render::render_asset::RenderAssetUsages;

use crate::plugins::config::{ForgeConfig, HallDef};
use crate::plugins::course::Course;
use crate::plugins::gating::{reflective_floor_gate, reflector_resolution, texture_load_gate, TextureCategory};
use crate::plugins::geometry;
use crate::plugins::gpu_tier::{GpuTier, GpuTierState};
use crate::plugins::layers::{LayerId, LayerRoot};
use crate::plugins::materials::{TextureLibrary, WallMaterials};
use crate::plugins::perf_monitor::PerfMonitor;
use crate::plugins::planner_state::PlannerState;

pub const PLAN_CLEAR: Color = Color::srgb(0.93, 0.94, 0.95);
pub const UV_CLEAR: Color = Color::srgb(0.02, 0.0, 0.05);
pub const UV_LAMP_SPACING: f32 = 4.0;
const FLOW_PATH_LIFT: f32 = 0.05;

#[derive(Component)]
pub struct HallFloor;
#[derive(Component)]
pub struct HallWalls;
#[derive(Component)]
pub struct UvLamp;
#[derive(Component)]
pub struct FlowPathLine;
#[derive(Component)]
pub struct Sun;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorStyle {
    Flat,
    Textured,
    Reflective,
    Uv,
}

/// Floor look for the current planner flags.
pub fn floor_style(state: &PlannerState, tier: GpuTier, perf: f32) -> FloorStyle {
    if reflective_floor_gate(state.uv_mode, state.view, tier, perf) {
        FloorStyle::Reflective
    } else if state.uv_mode {
        FloorStyle::Uv
    } else if texture_load_gate(tier) {
        FloorStyle::Textured
    } else {
        FloorStyle::Flat
    }
}

/// Lamp positions along the hall centre line, one per `spacing` metres.
pub fn uv_lamp_positions(hall: &HallDef, spacing: f32) -> Vec<Vec3> {
    if !(spacing > 0.0) || !(hall.length > 0.0) {
        return Vec::new();
    }
    let count = (hall.length / spacing).floor().max(1.0) as usize;
    let step = hall.length / count as f32;
    let y = hall.wall_height + 1.3;
    (0..count).map(|i| Vec3::new(hall.width * 0.5, y, step * (i as f32 + 0.5))).collect()
}

/// Planar reflection parameters for the glossy floor.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReflectorSettings {
    pub enabled: bool,
    pub resolution: u32,
}

impl Default for ReflectorSettings {
    fn default() -> Self {
        Self { enabled: false, resolution: reflector_resolution(GpuTier::Low) }
    }
}

#[derive(Resource, Debug, Clone)]
pub struct FloorMaterials {
    pub flat: Handle<StandardMaterial>,
    pub textured: Handle<StandardMaterial>,
    pub reflective: Handle<StandardMaterial>,
    pub uv: Handle<StandardMaterial>,
}

impl FloorMaterials {
    pub fn for_style(&self, style: FloorStyle) -> Handle<StandardMaterial> {
        match style {
            FloorStyle::Flat => self.flat.clone(),
            FloorStyle::Textured => self.textured.clone(),
            FloorStyle::Reflective => self.reflective.clone(),
            FloorStyle::Uv => self.uv.clone(),
        }
    }
}

/// Lamp mesh and material, alive only while UV mode is on.
#[derive(Resource)]
struct UvLampAssets {
    mesh: Handle<Mesh>,
    material: Handle<StandardMaterial>,
}

#[derive(Resource, Default)]
struct FlowPathMesh(Option<Handle<Mesh>>);

pub struct ScenePlugin;
impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ReflectorSettings>()
            .init_resource::<FlowPathMesh>()
            .add_systems(Startup, setup_hall)
            .add_systems(Update, (
                update_hall_materials,
                sync_uv_lamps,
                rebuild_flow_path,
            ));
    }
}

fn hall_def(config: &Option<Res<ForgeConfig>>) -> HallDef {
    config.as_ref().map(|c| c.hall).unwrap_or_default()
}

fn setup_hall(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<StandardMaterial>>,
    walls: Res<WallMaterials>,
    config: Option<Res<ForgeConfig>>,
) {
    let hall = hall_def(&config);
    let floor = FloorMaterials {
        flat: mats.add(StandardMaterial { base_color: Color::srgb(0.80, 0.80, 0.78), perceptual_roughness: 0.9, ..default() }),
        textured: mats.add(StandardMaterial { base_color: Color::WHITE, perceptual_roughness: 0.8, ..default() }),
        reflective: mats.add(StandardMaterial {
            base_color: Color::srgb(0.05, 0.03, 0.10),
            perceptual_roughness: 0.08,
            reflectance: 0.9,
            metallic: 0.3,
            ..default()
        }),
        uv: mats.add(StandardMaterial { base_color: Color::srgb(0.04, 0.03, 0.08), perceptual_roughness: 0.9, ..default() }),
    };

    let env = commands
        .spawn((SpatialBundle::default(), LayerRoot(LayerId::Environment), Name::new("Environment")))
        .id();
    let floor_mesh = geometry::cuboid(
        Vec3::new(hall.width * 0.5, -0.01, hall.length * 0.5),
        Vec3::new(hall.width, 0.02, hall.length),
    );
    let floor_entity = commands
        .spawn((
            PbrBundle { mesh: meshes.add(floor_mesh.into_mesh()), material: floor.flat.clone(), ..default() },
            HallFloor,
        ))
        .id();
    commands.entity(env).add_child(floor_entity);

    commands.spawn((
        PbrBundle {
            mesh: meshes.add(geometry::hall_walls(hall.width, hall.length, hall.wall_height, hall.wall_thickness).into_mesh()),
            material: walls.plan.clone(),
            ..default()
        },
        HallWalls,
        LayerRoot(LayerId::Walls),
        Name::new("Walls"),
    ));

    let sun_dir = Vec3::new(-0.4, -1.0, -0.3).normalize();
    let center = Vec3::new(hall.width * 0.5, 0.0, hall.length * 0.5);
    commands.spawn((
        DirectionalLightBundle {
            directional_light: DirectionalLight { illuminance: 12_000.0, shadows_enabled: true, ..default() },
            transform: Transform::from_translation(center - sun_dir * 30.0).looking_at(center, Vec3::Y),
            ..default()
        },
        Sun,
    ));
    commands.spawn((
        PbrBundle {
            mesh: meshes.add(Sphere::new(0.4).mesh().uv(16, 8)),
            material: mats.add(StandardMaterial {
                base_color: Color::srgb(1.0, 0.85, 0.3),
                emissive: LinearRgba::rgb(4.0, 3.2, 1.0),
                unlit: true,
                ..default()
            }),
            transform: Transform::from_translation(center - sun_dir * (hall.length * 0.6)),
            ..default()
        },
        LayerRoot(LayerId::SunIndicator),
        Name::new("SunIndicator"),
    ));

    commands.spawn((SpatialBundle::default(), LayerRoot(LayerId::FlowPath), FlowPathLine, Name::new("FlowPath")));
    commands.insert_resource(floor);
    info!("SCENE hall width={} length={} wall_height={}", hall.width, hall.length, hall.wall_height);
}

#[allow(clippy::too_many_arguments)]
fn update_hall_materials(
    planner: Res<PlannerState>,
    tier: Res<GpuTierState>,
    perf: Option<Res<PerfMonitor>>,
    floor: Option<Res<FloorMaterials>>,
    walls: Res<WallMaterials>,
    server: Option<Res<AssetServer>>,
    mut textures: ResMut<TextureLibrary>,
    mut mats: ResMut<Assets<StandardMaterial>>,
    mut reflector: ResMut<ReflectorSettings>,
    clear: Option<ResMut<ClearColor>>,
    mut q_floor: Query<&mut Handle<StandardMaterial>, (With<HallFloor>, Without<HallWalls>)>,
    mut q_walls: Query<&mut Handle<StandardMaterial>, (With<HallWalls>, Without<HallFloor>)>,
    mut last: Local<Option<(FloorStyle, GpuTier, PlannerState)>>,
) {
    let Some(floor) = floor else { return; };
    let effective = tier.effective();
    let perf_now = perf.map(|p| p.current()).unwrap_or(1.0);
    let style = floor_style(&planner, effective, perf_now);
    if *last == Some((style, effective, *planner)) { return; }
    *last = Some((style, effective, *planner));

    let server = server.as_deref();
    let wood = textures.textures_for(server, TextureCategory::Wood, effective, planner.view);
    if let Some(m) = mats.get_mut(&floor.textured) {
        wood.apply(m);
    }
    let concrete = textures.textures_for(server, TextureCategory::Concrete, effective, planner.view);
    if let Some(m) = mats.get_mut(&walls.plan) {
        concrete.apply(m);
    }

    let want_floor = floor.for_style(style);
    for mut h in &mut q_floor {
        if *h != want_floor { *h = want_floor.clone(); }
    }
    let want_walls = walls.for_mode(planner.uv_mode);
    for mut h in &mut q_walls {
        if *h != want_walls { *h = want_walls.clone(); }
    }

    let next = ReflectorSettings { enabled: style == FloorStyle::Reflective, resolution: reflector_resolution(effective) };
    if *reflector != next {
        *reflector = next;
    }
    if let Some(mut clear) = clear {
        clear.0 = if planner.uv_mode { UV_CLEAR } else { PLAN_CLEAR };
    }
    info!("SCENE floor={:?} tier={} reflector={}x{}", style, effective, next.resolution, next.resolution);
}

fn sync_uv_lamps(
    mut commands: Commands,
    planner: Res<PlannerState>,
    config: Option<Res<ForgeConfig>>,
    lamp_assets: Option<Res<UvLampAssets>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<StandardMaterial>>,
    q_env: Query<(Entity, &LayerRoot)>,
    q_lamps: Query<Entity, With<UvLamp>>,
) {
    if !planner.is_changed() { return; }
    let have = !q_lamps.is_empty();
    if planner.uv_mode == have { return; }

    if !planner.uv_mode {
        for e in &q_lamps {
            commands.entity(e).despawn_recursive();
        }
        if let Some(a) = lamp_assets {
            meshes.remove(a.mesh.id());
            mats.remove(a.material.id());
            commands.remove_resource::<UvLampAssets>();
        }
        debug!("UV_LAMPS removed");
        return;
    }

    let hall = hall_def(&config);
    let Some(env) = q_env.iter().find(|(_, l)| l.0 == LayerId::Environment).map(|(e, _)| e) else { return; };
    let mesh = meshes.add(geometry::cuboid(Vec3::ZERO, Vec3::new(1.2, 0.05, 0.12)).into_mesh());
    let material = mats.add(StandardMaterial {
        base_color: Color::srgb(0.55, 0.2, 1.0),
        emissive: LinearRgba::rgb(6.0, 1.5, 12.0),
        unlit: true,
        ..default()
    });
    let positions = uv_lamp_positions(&hall, UV_LAMP_SPACING);
    for p in &positions {
        let lamp = commands
            .spawn((
                PbrBundle { mesh: mesh.clone(), material: material.clone(), transform: Transform::from_translation(*p), ..default() },
                UvLamp,
            ))
            .with_children(|c| {
                c.spawn(PointLightBundle {
                    point_light: PointLight {
                        color: Color::srgb(0.55, 0.2, 1.0),
                        intensity: 60_000.0,
                        range: 8.0,
                        ..default()
                    },
                    transform: Transform::from_xyz(0.0, -0.1, 0.0),
                    ..default()
                });
            })
            .id();
        commands.entity(env).add_child(lamp);
    }
    commands.insert_resource(UvLampAssets { mesh, material });
    debug!("UV_LAMPS spawned count={}", positions.len());
}

/// Floor-level polyline through hole centres in play order.
pub fn flow_path_points(course: &Course) -> Vec<Vec3> {
    course.ordered().map(|h| Vec3::new(h.position.x, FLOW_PATH_LIFT, h.position.y)).collect()
}

fn rebuild_flow_path(
    mut commands: Commands,
    course: Res<Course>,
    mut cached: ResMut<FlowPathMesh>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<StandardMaterial>>,
    mut material: Local<Option<Handle<StandardMaterial>>>,
    q_root: Query<Entity, With<FlowPathLine>>,
) {
    if !course.is_changed() { return; }
    let Ok(root) = q_root.get_single() else { return; };
    if let Some(old) = cached.0.take() {
        meshes.remove(old.id());
    }
    let points = flow_path_points(&course);
    if points.len() < 2 {
        commands.entity(root).remove::<Handle<Mesh>>();
        return;
    }
    let mut mesh = Mesh::new(PrimitiveTopology::LineStrip, RenderAssetUsages::default());
    let normals = vec![[0.0, 1.0, 0.0]; points.len()];
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, points.iter().map(|p| p.to_array()).collect::<Vec<_>>());
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    let handle = meshes.add(mesh);
    let mat = material
        .get_or_insert_with(|| {
            mats.add(StandardMaterial { base_color: Color::srgb(1.0, 0.55, 0.1), unlit: true, ..default() })
        })
        .clone();
    commands.entity(root).insert((handle.clone(), mat));
    cached.0 = Some(handle);
}
