// Zoom driven level-of-detail selection.
//
// Two independent selectors sample the planner camera's zoom every frame: one
// picks the grid density band, the other the hole detail level. Each keeps its
// own threshold table and only reports when the band actually changes, so zoom
// jitter inside a band costs nothing downstream.

use bevy::prelude::*;
use serde::Deserialize;

use crate::plugins::camera::PlannerCamera;
use crate::plugins::config::ForgeConfig;

/// A discrete band picked from a continuous zoom value.
pub trait ZoomBanded: Copy + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    type Thresholds: Copy + std::fmt::Debug + Send + Sync + 'static;
    fn from_zoom(zoom: f32, thresholds: &Self::Thresholds) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoomBand {
    Far,
    Medium,
    Close,
}

/// Grid bands: below `medium` is far, above `close` is close; both boundary
/// values stay medium.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridZoomThresholds {
    pub medium: f32,
    pub close: f32,
}
impl Default for GridZoomThresholds {
    fn default() -> Self {
        Self { medium: 10.0, close: 30.0 }
    }
}

impl ZoomBanded for ZoomBand {
    type Thresholds = GridZoomThresholds;
    fn from_zoom(zoom: f32, t: &GridZoomThresholds) -> Self {
        if zoom < t.medium {
            ZoomBand::Far
        } else if zoom <= t.close {
            ZoomBand::Medium
        } else {
            ZoomBand::Close
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LodLevel {
    Overview,
    Standard,
    Detail,
}

/// Hole detail bands: `standard` and `detail` are inclusive lower bounds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct HoleLodThresholds {
    pub standard: f32,
    pub detail: f32,
}
impl Default for HoleLodThresholds {
    fn default() -> Self {
        Self { standard: 15.0, detail: 40.0 }
    }
}

impl ZoomBanded for LodLevel {
    type Thresholds = HoleLodThresholds;
    fn from_zoom(zoom: f32, t: &HoleLodThresholds) -> Self {
        if zoom < t.standard {
            LodLevel::Overview
        } else if zoom < t.detail {
            LodLevel::Standard
        } else {
            LodLevel::Detail
        }
    }
}

impl LodLevel {
    pub fn shows_markers(self) -> bool {
        self >= LodLevel::Standard
    }
    pub fn shows_fine_detail(self) -> bool {
        self == LodLevel::Detail
    }
}

/// Sample-and-compare state for one selector.
#[derive(Debug, Clone)]
pub struct BandTracker<B: ZoomBanded> {
    pub thresholds: B::Thresholds,
    current: Option<B>,
}

impl<B: ZoomBanded> BandTracker<B> {
    pub fn new(thresholds: B::Thresholds) -> Self {
        Self { thresholds, current: None }
    }

    pub fn current(&self) -> Option<B> {
        self.current
    }

    /// Records the band for `zoom`; `Some` only on a transition (including the
    /// very first sample).
    pub fn observe(&mut self, zoom: f32) -> Option<B> {
        let band = B::from_zoom(zoom, &self.thresholds);
        if self.current == Some(band) {
            return None;
        }
        self.current = Some(band);
        Some(band)
    }
}

#[derive(Resource, Debug, Clone)]
pub struct GridBandTracker(pub BandTracker<ZoomBand>);

#[derive(Resource, Debug, Clone)]
pub struct HoleLodTracker(pub BandTracker<LodLevel>);

#[derive(Event, Debug, Clone, Copy)]
pub struct ZoomBandChanged {
    pub band: ZoomBand,
    pub zoom: f32,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct HoleLodChanged {
    pub level: LodLevel,
    pub zoom: f32,
}

pub struct LodPlugin;
impl Plugin for LodPlugin {
    fn build(&self, app: &mut App) {
        let (grid, hole) = app
            .world()
            .get_resource::<ForgeConfig>()
            .map(|c| (c.grid_zoom, c.hole_lod))
            .unwrap_or_default();
        app.insert_resource(GridBandTracker(BandTracker::new(grid)))
            .insert_resource(HoleLodTracker(BandTracker::new(hole)))
            .add_event::<ZoomBandChanged>()
            .add_event::<HoleLodChanged>()
            .add_systems(PreUpdate, sample_camera_zoom);
    }
}

fn sample_camera_zoom(
    q_cam: Query<&PlannerCamera>,
    mut grid: ResMut<GridBandTracker>,
    mut hole: ResMut<HoleLodTracker>,
    mut ev_grid: EventWriter<ZoomBandChanged>,
    mut ev_hole: EventWriter<HoleLodChanged>,
) {
    let Ok(cam) = q_cam.get_single() else { return; };
    let zoom = cam.zoom;
    if let Some(band) = grid.0.observe(zoom) {
        debug!("LOD grid_band={band:?} zoom={zoom:.2}");
        ev_grid.send(ZoomBandChanged { band, zoom });
    }
    if let Some(level) = hole.0.observe(zoom) {
        debug!("LOD hole_level={level:?} zoom={zoom:.2}");
        ev_hole.send(HoleLodChanged { level, zoom });
    }
}
