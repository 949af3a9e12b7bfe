// Adaptive floor grid: line spacing follows the grid zoom band, coincident
// minor lines are dropped, and coordinate labels sit just outside the hall.

use std::collections::HashSet;

use bevy::prelude::*;
use bevy::render::mesh::PrimitiveTopology;
use bevy::render::render_asset::RenderAssetUsages;

use crate::plugins::camera::PlannerCamera;
use crate::plugins::config::ForgeConfig;
use crate::plugins::layers::{LayerId, LayerRoot, LayerStates};
use crate::plugins::lod::{GridZoomThresholds, ZoomBand, ZoomBandChanged, ZoomBanded};

/// Labels sit this far outside the grid on the perpendicular axis.
pub const LABEL_MARGIN: f32 = -0.5;
const GRID_LIFT: f32 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpacing {
    pub major: f32,
    pub minor: Option<f32>,
}

pub fn spacing_for_band(band: ZoomBand) -> GridSpacing {
    match band {
        ZoomBand::Far => GridSpacing { major: 5.0, minor: None },
        ZoomBand::Medium => GridSpacing { major: 1.0, minor: Some(0.5) },
        ZoomBand::Close => GridSpacing { major: 1.0, minor: Some(0.25) },
    }
}

pub fn spacing_for_zoom(zoom: f32) -> GridSpacing {
    spacing_for_band(ZoomBand::from_zoom(zoom, &GridZoomThresholds::default()))
}

fn round_milli(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

fn coord_key(v: f32) -> i64 {
    (v as f64 * 1000.0).round() as i64
}

/// Multiples of `spacing` in `[0, extent]`, including `extent` itself when it
/// lands on a multiple. Empty for non-positive spacing or negative extent.
pub fn axis_positions(extent: f32, spacing: f32) -> Vec<f32> {
    if !(spacing > 0.0) || !spacing.is_finite() || !extent.is_finite() || extent < 0.0 {
        return Vec::new();
    }
    let count = (extent / spacing + 1e-5).floor() as usize;
    (0..=count).map(|i| i as f32 * spacing).collect()
}

fn push_segments(points: &mut Vec<Vec3>, xs: &[f32], zs: &[f32], width: f32, length: f32) {
    for &x in xs {
        points.push(Vec3::new(x, 0.0, 0.0));
        points.push(Vec3::new(x, 0.0, length));
    }
    for &z in zs {
        points.push(Vec3::new(0.0, 0.0, z));
        points.push(Vec3::new(width, 0.0, z));
    }
}

/// Endpoint pairs for every grid line: constant-x lines first, then constant-z.
pub fn line_segments_for_extent(width: f32, length: f32, spacing: f32) -> Vec<Vec3> {
    let xs = axis_positions(width, spacing);
    let zs = axis_positions(length, spacing);
    if xs.is_empty() || zs.is_empty() {
        return Vec::new();
    }
    let mut points = Vec::with_capacity((xs.len() + zs.len()) * 2);
    push_segments(&mut points, &xs, &zs, width, length);
    points
}

/// Minor lines with every line that coincides with a major one removed.
pub fn minor_segments_for_extent(width: f32, length: f32, minor: f32, major: f32) -> Vec<Vec3> {
    if !(minor > 0.0) || width < 0.0 || length < 0.0 {
        return Vec::new();
    }
    let major_x: HashSet<i64> = axis_positions(width, major).into_iter().map(coord_key).collect();
    let major_z: HashSet<i64> = axis_positions(length, major).into_iter().map(coord_key).collect();
    let xs: Vec<f32> = axis_positions(width, minor).into_iter().filter(|x| !major_x.contains(&coord_key(*x))).collect();
    let zs: Vec<f32> = axis_positions(length, minor).into_iter().filter(|z| !major_z.contains(&coord_key(*z))).collect();
    let mut points = Vec::with_capacity((xs.len() + zs.len()) * 2);
    push_segments(&mut points, &xs, &zs, width, length);
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAxis {
    X,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLabel {
    pub value: f32,
    pub position: Vec3,
}

pub fn label_positions_for_axis(axis: GridAxis, max_value: f32, spacing: f32) -> Vec<GridLabel> {
    axis_positions(max_value, spacing)
        .into_iter()
        .map(|v| {
            let value = round_milli(v);
            let position = match axis {
                GridAxis::X => Vec3::new(value, 0.0, LABEL_MARGIN),
                GridAxis::Z => Vec3::new(LABEL_MARGIN, 0.0, value),
            };
            GridLabel { value, position }
        })
        .collect()
}

pub fn format_label(value: f32) -> String {
    if value.fract() == 0.0 { format!("{}", value as i32) } else { format!("{value}") }
}

/// Line-list mesh on the floor plane.
pub fn line_list_mesh(points: &[Vec3]) -> Mesh {
    let positions: Vec<[f32; 3]> = points.iter().map(|p| [p.x, p.y + GRID_LIFT, p.z]).collect();
    let normals = vec![[0.0, 1.0, 0.0]; positions.len()];
    let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh
}

#[derive(Component)]
pub struct GridRoot;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLineKind {
    Major,
    Minor,
}

#[derive(Component)]
pub struct GridLabelText {
    pub world: Vec3,
}

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct ActiveGridSpacing(pub GridSpacing);

pub struct GridPlugin;
impl Plugin for GridPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_grid_root)
            .add_systems(Update, (rebuild_grid_on_band_change, position_grid_labels.after(rebuild_grid_on_band_change)));
    }
}

fn spawn_grid_root(mut commands: Commands, mut mats: ResMut<Assets<StandardMaterial>>) {
    let major = mats.add(StandardMaterial {
        base_color: Color::srgba(0.55, 0.60, 0.70, 0.9),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    });
    let minor = mats.add(StandardMaterial {
        base_color: Color::srgba(0.40, 0.44, 0.52, 0.6),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    });
    commands
        .spawn((SpatialBundle::default(), GridRoot, LayerRoot(LayerId::Grid), Name::new("grid")))
        .with_children(|root| {
            root.spawn((PbrBundle { material: major, ..default() }, GridLineKind::Major));
            root.spawn((PbrBundle { material: minor, ..default() }, GridLineKind::Minor));
        });
}

fn rebuild_grid_on_band_change(
    mut commands: Commands,
    mut ev_band: EventReader<ZoomBandChanged>,
    config: Option<Res<ForgeConfig>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut q_lines: Query<(&GridLineKind, &mut Handle<Mesh>)>,
    q_labels: Query<Entity, With<GridLabelText>>,
) {
    let Some(changed) = ev_band.read().last().copied() else { return; };
    let hall = config.map(|c| c.hall).unwrap_or_default();
    let spacing = spacing_for_band(changed.band);

    for (kind, mut handle) in &mut q_lines {
        let points = match (kind, spacing.minor) {
            (GridLineKind::Major, _) => line_segments_for_extent(hall.width, hall.length, spacing.major),
            (GridLineKind::Minor, Some(minor)) => minor_segments_for_extent(hall.width, hall.length, minor, spacing.major),
            (GridLineKind::Minor, None) => Vec::new(),
        };
        // Drop the superseded buffer in the same step that swaps in the new one.
        meshes.remove(handle.id());
        *handle = meshes.add(line_list_mesh(&points));
    }

    for e in &q_labels {
        commands.entity(e).despawn_recursive();
    }
    let labels = label_positions_for_axis(GridAxis::X, hall.width, spacing.major)
        .into_iter()
        .chain(label_positions_for_axis(GridAxis::Z, hall.length, spacing.major));
    for label in labels {
        commands.spawn((
            TextBundle::from_section(
                format_label(label.value),
                TextStyle { font_size: 12.0, color: Color::srgb(0.75, 0.80, 0.90), ..default() },
            )
            .with_style(Style { position_type: PositionType::Absolute, ..default() }),
            GridLabelText { world: label.position },
        ));
    }
    commands.insert_resource(ActiveGridSpacing(spacing));
    info!("GRID band={:?} major={} minor={:?}", changed.band, spacing.major, spacing.minor);
}

fn position_grid_labels(
    layers: Option<Res<LayerStates>>,
    q_cam: Query<(&Camera, &GlobalTransform), With<PlannerCamera>>,
    mut q_labels: Query<(&GridLabelText, &mut Style, &mut Visibility)>,
) {
    let Ok((camera, cam_t)) = q_cam.get_single() else { return; };
    let grid_visible = layers.map(|l| l.get(LayerId::Grid).visible).unwrap_or(true);
    for (label, mut style, mut vis) in &mut q_labels {
        match camera.world_to_viewport(cam_t, label.world).filter(|_| grid_visible) {
            Some(p) => {
                style.left = Val::Px(p.x - 6.0);
                style.top = Val::Px(p.y - 7.0);
                *vis = Visibility::Inherited;
            }
            None => *vis = Visibility::Hidden,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacing_table() {
        assert_eq!(spacing_for_zoom(5.0), GridSpacing { major: 5.0, minor: None });
        assert_eq!(spacing_for_zoom(10.0), GridSpacing { major: 1.0, minor: Some(0.5) });
        assert_eq!(spacing_for_zoom(30.0), GridSpacing { major: 1.0, minor: Some(0.5) });
        assert_eq!(spacing_for_zoom(30.01), GridSpacing { major: 1.0, minor: Some(0.25) });
    }

    #[test]
    fn segment_counts() {
        assert_eq!(line_segments_for_extent(10.0, 20.0, 1.0).len(), 64);
        assert_eq!(line_segments_for_extent(10.0, 20.0, 3.0).len(), 22);
        assert!(line_segments_for_extent(10.0, 20.0, 0.0).is_empty());
        assert!(line_segments_for_extent(10.0, 20.0, -1.0).is_empty());
        assert!(line_segments_for_extent(-1.0, 20.0, 1.0).is_empty());
        assert!(line_segments_for_extent(10.0, 20.0, f32::NAN).is_empty());
    }

    #[test]
    fn uneven_spacing_stops_before_extent() {
        let pts = line_segments_for_extent(10.0, 20.0, 3.0);
        let max_x = pts.iter().map(|p| p.x).fold(f32::MIN, f32::max);
        // last vertical line is at 9; horizontal lines still span the full width
        assert!(pts.iter().step_by(2).take(4).all(|p| p.x <= 9.0));
        assert_eq!(max_x, 10.0);
    }

    #[test]
    fn fractional_spacing_reaches_extent() {
        assert_eq!(axis_positions(1.0, 0.1).len(), 11);
        assert_eq!(axis_positions(10.0, 0.25).len(), 41);
    }

    #[test]
    fn minor_lines_skip_major_positions() {
        let pts = minor_segments_for_extent(10.0, 20.0, 0.5, 1.0);
        // 10 minor x lines (0.5, 1.5 .. 9.5) and 20 minor z lines
        assert_eq!(pts.len(), (10 + 20) * 2);
        assert!(pts.iter().step_by(2).take(10).all(|p| p.x.fract() == 0.5));
        let quarter = minor_segments_for_extent(10.0, 20.0, 0.25, 1.0);
        assert_eq!(quarter.len(), (30 + 60) * 2);
    }

    #[test]
    fn labels_on_major_lines() {
        let labels = label_positions_for_axis(GridAxis::X, 10.0, 5.0);
        let values: Vec<f32> = labels.iter().map(|l| l.value).collect();
        assert_eq!(values, vec![0.0, 5.0, 10.0]);
        assert!(labels.iter().all(|l| l.position.z == LABEL_MARGIN));

        let z = label_positions_for_axis(GridAxis::Z, 2.0, 1.0);
        assert_eq!(z[2].position, Vec3::new(LABEL_MARGIN, 0.0, 2.0));

        assert!(label_positions_for_axis(GridAxis::X, 10.0, 0.0).is_empty());
    }

    #[test]
    fn label_values_are_rounded() {
        let labels = label_positions_for_axis(GridAxis::X, 1.0, 0.1);
        assert_eq!(labels[3].value, 0.3);
        assert_eq!(format_label(5.0), "5");
        assert_eq!(format_label(0.5), "0.5");
    }
}
