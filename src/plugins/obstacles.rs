// Hole rendering: lane felt, bumpers, markers and the obstacle bodies built
// from `geometry`. Each hole is rebuilt only when its render configuration
// (kind, size, materials, LOD, view) changes; otherwise only its transform
// follows the course model.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::plugins::config::ForgeConfig;
use crate::plugins::course::{Course, HoleEntity, HoleId, HoleKind};
use crate::plugins::gating::{flag_pin_visible, use_simplified_bumpers, ViewMode};
use crate::plugins::geometry::{self, MeshData};
use crate::plugins::gpu_tier::GpuTierState;
use crate::plugins::layers::{LayerId, LayerRoot};
use crate::plugins::lod::{HoleLodChanged, HoleLodTracker, LodLevel};
use crate::plugins::materials::{MaterialCache, MaterialKey, MaterialSet, TextureLibrary};
use crate::plugins::planner_state::PlannerState;

pub const LANE_WIDTH: f32 = 0.7;
pub const FELT_THICKNESS: f32 = 0.01;
pub const BUMPER_THICKNESS: f32 = 0.05;
pub const BUMPER_HEIGHT: f32 = 0.08;
pub const SIMPLIFIED_BUMPER_HEIGHT: f32 = 0.02;
pub const CUP_RADIUS: f32 = 0.054;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartRole {
    Felt,
    Bumper,
    Tee,
    Cup,
    FlagPin,
    Obstacle,
    /// Child of the spinning windmill hub; transform is hub-local.
    Blade,
}

#[derive(Debug, Clone)]
pub struct HolePart {
    pub role: PartRole,
    pub mesh: MeshData,
    pub transform: Transform,
}

impl HolePart {
    fn at(role: PartRole, mesh: MeshData, translation: Vec3) -> Self {
        Self { role, mesh, transform: Transform::from_translation(translation) }
    }
}

/// Tessellation density per LOD level.
pub fn segments_for(lod: LodLevel) -> u32 {
    match lod {
        LodLevel::Overview => 8,
        LodLevel::Standard => 16,
        LodLevel::Detail => 32,
    }
}

/// Felt rectangles in hole-local (x, z), lane running from -z (tee) to +z.
pub fn lane_rects(kind: HoleKind, size: Vec2) -> Vec<Rect> {
    let (w, l) = (size.x, size.y);
    if !(w > 0.0 && l > 0.0) {
        return Vec::new();
    }
    let lane = LANE_WIDTH.min(w);
    match kind {
        HoleKind::LShape => vec![
            Rect::new(-w * 0.5, -l * 0.5, -w * 0.5 + lane, l * 0.5),
            Rect::new(-w * 0.5 + lane, l * 0.5 - lane, w * 0.5, l * 0.5),
        ],
        HoleKind::Dogleg => vec![
            Rect::new(-w * 0.5, -l * 0.5, -w * 0.5 + lane, lane * 0.5),
            Rect::new(-w * 0.5 + lane, -lane * 0.5, w * 0.5 - lane, lane * 0.5),
            Rect::new(w * 0.5 - lane, -lane * 0.5, w * 0.5, l * 0.5),
        ],
        _ => vec![Rect::new(-w * 0.5, -l * 0.5, w * 0.5, l * 0.5)],
    }
}

/// Tee and cup positions on the floor.
pub fn tee_and_cup(kind: HoleKind, size: Vec2) -> (Vec2, Vec2) {
    let rects = lane_rects(kind, size);
    let (Some(first), Some(last)) = (rects.first(), rects.last()) else {
        return (Vec2::ZERO, Vec2::ZERO);
    };
    let inset = 0.25_f32.min(size.y * 0.25);
    let tee = Vec2::new(first.center().x, first.min.y + inset);
    let cup = match kind {
        HoleKind::LShape => Vec2::new(last.max.x - inset, last.center().y),
        _ => Vec2::new(last.center().x, last.max.y - inset),
    };
    (tee, cup)
}

fn rail_size(along_z: bool, len: f32, height: f32, thickness: f32) -> Vec3 {
    if along_z {
        Vec3::new(thickness, height, len)
    } else {
        Vec3::new(len, height, thickness)
    }
}

/// Every renderable part of a hole for the given detail level and view.
pub fn hole_parts(kind: HoleKind, size: Vec2, lod: LodLevel, view: ViewMode) -> Vec<HolePart> {
    let mut parts = Vec::new();
    let rects = lane_rects(kind, size);
    if rects.is_empty() {
        return parts;
    }
    let simplified = use_simplified_bumpers(view);
    let bumper_h = if simplified { SIMPLIFIED_BUMPER_HEIGHT } else { BUMPER_HEIGHT };
    let rails = lod.shows_fine_detail() && !simplified;

    for r in &rects {
        let c = r.center();
        parts.push(HolePart::at(
            PartRole::Felt,
            geometry::cuboid(Vec3::ZERO, Vec3::new(r.width(), FELT_THICKNESS, r.height())),
            Vec3::new(c.x, FELT_THICKNESS * 0.5, c.y),
        ));
        // Rails along both long sides of each felt piece.
        let along_z = r.height() >= r.width();
        for side in [-1.0_f32, 1.0] {
            let (pos, len) = if along_z {
                (Vec2::new(c.x + side * (r.width() + BUMPER_THICKNESS) * 0.5, c.y), r.height())
            } else {
                (Vec2::new(c.x, c.y + side * (r.height() + BUMPER_THICKNESS) * 0.5), r.width())
            };
            parts.push(HolePart::at(
                PartRole::Bumper,
                geometry::cuboid(Vec3::ZERO, rail_size(along_z, len, bumper_h, BUMPER_THICKNESS)),
                Vec3::new(pos.x, bumper_h * 0.5, pos.y),
            ));
            if rails {
                parts.push(HolePart::at(
                    PartRole::Bumper,
                    geometry::cuboid(Vec3::ZERO, rail_size(along_z, len, 0.012, BUMPER_THICKNESS * 1.6)),
                    Vec3::new(pos.x, bumper_h + 0.006, pos.y),
                ));
            }
        }
    }

    if lod.shows_markers() {
        let (tee, cup) = tee_and_cup(kind, size);
        parts.push(HolePart::at(
            PartRole::Tee,
            geometry::cuboid(Vec3::ZERO, Vec3::new(0.2, 0.004, 0.2)),
            Vec3::new(tee.x, FELT_THICKNESS + 0.002, tee.y),
        ));
        parts.push(HolePart::at(
            PartRole::Cup,
            geometry::frustum(CUP_RADIUS, CUP_RADIUS, 0.004, segments_for(lod), true),
            Vec3::new(cup.x, FELT_THICKNESS, cup.y),
        ));
        if lod.shows_fine_detail() && flag_pin_visible(view) {
            let mut pin = geometry::frustum(0.006, 0.006, 0.6, 6, true);
            pin.append(geometry::cuboid(Vec3::new(0.09, 0.54, 0.0), Vec3::new(0.16, 0.1, 0.004)));
            parts.push(HolePart::at(PartRole::FlagPin, pin, Vec3::new(cup.x, FELT_THICKNESS, cup.y)));
        }
    }

    parts.extend(obstacle_parts(kind, size, lod));
    parts.retain(|p| !p.mesh.is_empty());
    parts
}

pub const WINDMILL_HUB: Vec3 = Vec3::new(0.0, 0.75, -0.34);

fn obstacle_parts(kind: HoleKind, size: Vec2, lod: LodLevel) -> Vec<HolePart> {
    let seg = segments_for(lod);
    let lane = LANE_WIDTH.min(size.x);
    match kind {
        HoleKind::Ramp => vec![HolePart::at(
            PartRole::Obstacle,
            geometry::ramp(lane, size.y * 0.4, 0.25, seg),
            Vec3::new(0.0, FELT_THICKNESS, 0.0),
        )],
        HoleKind::Tunnel => vec![HolePart::at(
            PartRole::Obstacle,
            geometry::tunnel_arch(lane * 0.5 + 0.08, 0.08, size.y * 0.4, seg),
            Vec3::ZERO,
        )],
        HoleKind::Loop => {
            let radius = 0.35;
            let diameter = lane + 0.1;
            let mut parts = vec![HolePart::at(
                PartRole::Obstacle,
                geometry::loop_tube(radius, 0.03, seg * 2, (seg / 2).max(3)),
                Vec3::new(0.0, FELT_THICKNESS, -radius * 0.5),
            )];
            for x in [-diameter * 0.5, diameter * 0.5] {
                parts.push(HolePart::at(
                    PartRole::Obstacle,
                    geometry::loop_pillar(0.04, 0.03, radius * 2.0),
                    Vec3::new(x, 0.0, 0.0),
                ));
            }
            parts.push(HolePart::at(PartRole::Obstacle, geometry::loop_brace(diameter), Vec3::new(0.0, radius * 2.0, 0.0)));
            parts
        }
        HoleKind::Windmill => {
            let mut parts = vec![
                HolePart::at(PartRole::Obstacle, geometry::windmill_tower(0.3, 0.22, 0.8, seg), Vec3::ZERO),
                HolePart::at(PartRole::Obstacle, geometry::windmill_roof(0.28, 0.3, seg), Vec3::new(0.0, 0.8, 0.0)),
            ];
            for i in 0..4 {
                parts.push(HolePart {
                    role: PartRole::Blade,
                    mesh: geometry::windmill_blade(0.06, 0.16, 0.6, 0.015),
                    transform: Transform::from_rotation(Quat::from_rotation_z(i as f32 * std::f32::consts::FRAC_PI_2)),
                });
            }
            parts
        }
        _ => Vec::new(),
    }
}

/// Every mesh handle a hole allocated. Released before replacement.
#[derive(Component, Debug, Default)]
pub struct ObstacleGeometry {
    pub meshes: Vec<Handle<Mesh>>,
}

impl ObstacleGeometry {
    pub fn release(&mut self, meshes: &mut Assets<Mesh>) -> usize {
        let n = self.meshes.len();
        for h in self.meshes.drain(..) {
            meshes.remove(h.id());
        }
        n
    }
}

/// Render configuration a hole entity was built for.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct HoleRender {
    pub material: MaterialKey,
    pub lod: LodLevel,
    pub view: ViewMode,
    pub size: Vec2,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct WindmillHub {
    /// Radians per second.
    pub speed: f32,
    pub angle: f32,
}

#[derive(Component)]
pub struct HolesRoot;

pub struct ObstaclesPlugin;
impl Plugin for ObstaclesPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_holes_root)
            .add_systems(Update, (sync_hole_entities, spin_windmills).chain());
    }
}

fn spawn_holes_root(mut commands: Commands) {
    commands.spawn((SpatialBundle::default(), HolesRoot, LayerRoot(LayerId::Holes), Name::new("Holes")));
}

fn material_for(role: PartRole, set: &MaterialSet) -> Handle<StandardMaterial> {
    match role {
        PartRole::Felt => set.felt.clone(),
        PartRole::Bumper => set.bumper.clone(),
        PartRole::Tee => set.tee.clone(),
        PartRole::Cup => set.cup.clone(),
        PartRole::FlagPin | PartRole::Obstacle | PartRole::Blade => set.accent.clone(),
    }
}

#[allow(clippy::too_many_arguments)]
fn sync_hole_entities(
    mut commands: Commands,
    course: Res<Course>,
    planner: Res<PlannerState>,
    tier: Res<GpuTierState>,
    lod: Res<HoleLodTracker>,
    config: Option<Res<ForgeConfig>>,
    server: Option<Res<AssetServer>>,
    mut ev_lod: EventReader<HoleLodChanged>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut cache: ResMut<MaterialCache>,
    mut textures: ResMut<TextureLibrary>,
    q_root: Query<Entity, With<HolesRoot>>,
    mut q_holes: Query<(Entity, &HoleEntity, &HoleRender, &mut Transform, &mut ObstacleGeometry)>,
) {
    let lod_changed = ev_lod.read().count() > 0;
    if !(course.is_changed() || planner.is_changed() || tier.is_changed() || lod_changed) {
        return;
    }
    let Ok(root) = q_root.get_single() else { return; };
    let level = lod.0.current().unwrap_or(LodLevel::Standard);
    let effective = tier.effective();
    let spin = config.map(|c| c.windmill_speed).unwrap_or(1.2);

    let mut existing: HashMap<HoleId, (Entity, HoleRender)> = HashMap::new();
    for (e, hole, render, mut tf, mut geo) in &mut q_holes {
        match course.get(hole.id) {
            Some(model) => {
                let target = model.transform();
                if *tf != target {
                    *tf = target;
                }
                existing.insert(hole.id, (e, *render));
            }
            None => {
                geo.release(&mut meshes);
                commands.entity(e).despawn_recursive();
            }
        }
    }

    let mut in_use = HashSet::new();
    let mut rebuilt = 0;
    for hole in course.ordered() {
        let (size, felt) = course.resolved_appearance(hole);
        let mut key = MaterialKey::new(hole.kind, planner.uv_mode, effective, planner.view);
        if hole.template_id.is_some() {
            key = key.with_tint(felt);
        }
        in_use.insert(key);
        let want = HoleRender { material: key, lod: level, view: planner.view, size };
        if let Some((e, have)) = existing.get(&hole.id) {
            if *have == want { continue; }
            if let Ok((_, _, _, _, mut geo)) = q_holes.get_mut(*e) {
                geo.release(&mut meshes);
            }
            commands.entity(*e).despawn_recursive();
        }
        let set = cache.get_or_create(key, &mut materials, &mut textures, server.as_deref());
        spawn_hole(&mut commands, root, hole.id, hole.kind, hole.transform(), want, &set, spin, &mut meshes);
        rebuilt += 1;
    }

    let released = cache.retain_only(&in_use, &mut materials);
    if rebuilt > 0 || released > 0 {
        info!("HOLES rebuilt={} material_sets_released={} lod={:?} view={:?}", rebuilt, released, level, planner.view);
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_hole(
    commands: &mut Commands,
    root: Entity,
    id: HoleId,
    kind: HoleKind,
    transform: Transform,
    render: HoleRender,
    set: &MaterialSet,
    spin: f32,
    meshes: &mut Assets<Mesh>,
) {
    let parts = hole_parts(kind, render.size, render.lod, render.view);
    let mut geo = ObstacleGeometry::default();
    let mut blades = Vec::new();
    let hole = commands
        .spawn((SpatialBundle::from_transform(transform), HoleEntity { id, kind }, render, Name::new(kind.label())))
        .id();
    commands.entity(root).add_child(hole);
    for part in parts {
        let mesh = meshes.add(part.mesh.into_mesh());
        geo.meshes.push(mesh.clone());
        let child = commands
            .spawn(PbrBundle {
                mesh,
                material: material_for(part.role, set),
                transform: part.transform,
                ..default()
            })
            .id();
        if part.role == PartRole::Blade {
            blades.push(child);
        } else {
            commands.entity(hole).add_child(child);
        }
    }
    if !blades.is_empty() {
        let hub = commands
            .spawn((
                SpatialBundle::from_transform(Transform::from_translation(WINDMILL_HUB)),
                WindmillHub { speed: spin, angle: 0.0 },
            ))
            .push_children(&blades)
            .id();
        commands.entity(hole).add_child(hub);
    }
    commands.entity(hole).insert(geo);
}

fn spin_windmills(time: Res<Time>, mut q: Query<(&mut WindmillHub, &mut Transform)>) {
    let dt = time.delta_seconds();
    for (mut hub, mut tf) in &mut q {
        hub.angle = (hub.angle + hub.speed * dt).rem_euclid(std::f32::consts::TAU);
        tf.rotation = Quat::from_rotation_z(hub.angle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(parts: &[HolePart]) -> Vec<PartRole> {
        parts.iter().map(|p| p.role).collect()
    }

    #[test]
    fn overview_hides_markers() {
        let parts = hole_parts(HoleKind::Straight, Vec2::new(0.8, 3.0), LodLevel::Overview, ViewMode::ThreeD);
        let r = roles(&parts);
        assert!(r.contains(&PartRole::Felt));
        assert!(!r.contains(&PartRole::Tee));
        assert!(!r.contains(&PartRole::Cup));
        assert!(!r.contains(&PartRole::FlagPin));
    }

    #[test]
    fn flag_pin_only_at_detail_in_3d() {
        let size = Vec2::new(0.8, 3.0);
        let std3d = roles(&hole_parts(HoleKind::Straight, size, LodLevel::Standard, ViewMode::ThreeD));
        assert!(std3d.contains(&PartRole::Tee) && std3d.contains(&PartRole::Cup));
        assert!(!std3d.contains(&PartRole::FlagPin));
        let detail3d = roles(&hole_parts(HoleKind::Straight, size, LodLevel::Detail, ViewMode::ThreeD));
        assert!(detail3d.contains(&PartRole::FlagPin));
        let detail_top = roles(&hole_parts(HoleKind::Straight, size, LodLevel::Detail, ViewMode::Top));
        assert!(!detail_top.contains(&PartRole::FlagPin));
    }

    #[test]
    fn top_view_uses_low_bumpers_without_rails() {
        let size = Vec2::new(0.8, 3.0);
        let count = |view| {
            hole_parts(HoleKind::Straight, size, LodLevel::Detail, view)
                .iter()
                .filter(|p| p.role == PartRole::Bumper)
                .count()
        };
        assert_eq!(count(ViewMode::Top), 2);
        assert_eq!(count(ViewMode::ThreeD), 4);
        let top = hole_parts(HoleKind::Straight, size, LodLevel::Standard, ViewMode::Top);
        let bumper = top.iter().find(|p| p.role == PartRole::Bumper).unwrap();
        assert!((bumper.transform.translation.y - SIMPLIFIED_BUMPER_HEIGHT * 0.5).abs() < 1e-6);
    }

    #[test]
    fn windmill_has_four_blades() {
        let parts = hole_parts(HoleKind::Windmill, Vec2::new(1.0, 3.0), LodLevel::Standard, ViewMode::ThreeD);
        assert_eq!(parts.iter().filter(|p| p.role == PartRole::Blade).count(), 4);
    }

    #[test]
    fn detail_tessellates_finer() {
        let tris = |lod| {
            hole_parts(HoleKind::Tunnel, Vec2::new(0.8, 4.0), lod, ViewMode::ThreeD)
                .iter()
                .filter(|p| p.role == PartRole::Obstacle)
                .map(|p| p.mesh.triangle_count())
                .sum::<usize>()
        };
        assert!(tris(LodLevel::Detail) > tris(LodLevel::Overview));
    }

    #[test]
    fn lanes_stay_inside_footprint() {
        for kind in HoleKind::ALL {
            let size = kind.default_size();
            let bounds = Rect::from_center_size(Vec2::ZERO, size);
            for r in lane_rects(kind, size) {
                assert!(r.min.x >= bounds.min.x - 1e-5 && r.max.x <= bounds.max.x + 1e-5, "{kind:?}");
                assert!(r.min.y >= bounds.min.y - 1e-5 && r.max.y <= bounds.max.y + 1e-5, "{kind:?}");
            }
            let (tee, cup) = tee_and_cup(kind, size);
            assert!(tee.distance(cup) > 0.5, "{kind:?}");
        }
        assert!(hole_parts(HoleKind::Straight, Vec2::ZERO, LodLevel::Detail, ViewMode::ThreeD).is_empty());
    }

    #[test]
    fn release_removes_every_handle() {
        let mut meshes = Assets::<Mesh>::default();
        let mut geo = ObstacleGeometry::default();
        for part in hole_parts(HoleKind::Loop, Vec2::new(0.8, 3.0), LodLevel::Standard, ViewMode::ThreeD) {
            geo.meshes.push(meshes.add(part.mesh.into_mesh()));
        }
        let n = meshes.len();
        assert!(n > 0);
        assert_eq!(geo.release(&mut meshes), n);
        assert_eq!(meshes.len(), 0);
    }
}
