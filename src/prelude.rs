//! Convenience re-exports for frequently used types & plugins.
pub use crate::plugins::camera::{camera_preset, CameraPlugin, CameraPreset, CameraPresetConfig, PlannerCamera};
pub use crate::plugins::config::{ForgeConfig, ForgeError, HallDef};
pub use crate::plugins::course::{Course, CoursePlugin, Hole, HoleId, HoleKind};
pub use crate::plugins::gating::ViewMode;
pub use crate::plugins::gpu_tier::{GpuTier, GpuTierPlugin, GpuTierState, TierOverride, TierSource};
pub use crate::plugins::grid::{GridPlugin, GridSpacing};
pub use crate::plugins::layers::{LayerId, LayerRoot, LayerStates, LayersPlugin};
pub use crate::plugins::lod::{HoleLodChanged, LodLevel, LodPlugin, ZoomBand, ZoomBandChanged};
pub use crate::plugins::materials::{MaterialCache, MaterialsPlugin, WallMaterials};
pub use crate::plugins::obstacles::{ObstacleGeometry, ObstaclesPlugin};
pub use crate::plugins::opacity::{GroupOpacity, OpacityManager, OpacityPlugin};
pub use crate::plugins::perf_monitor::{PerfMonitor, PerfMonitorPlugin};
pub use crate::plugins::planner_state::{PlannerState, PlannerStatePlugin};
pub use crate::plugins::post_fx::{ActivePostEffects, PostFxPlugin};
pub use crate::plugins::scene::{ReflectorSettings, ScenePlugin};
pub use crate::plugins::storage::{KeyValueStore, MemoryStore, PreferenceStore, StoreError};
