// Planner configuration: hall dimensions, LOD threshold tables, tier override,
// preference store location. Loaded from RON, every field optional.
use bevy::prelude::*;
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::plugins::gating::ViewMode;
use crate::plugins::gpu_tier::TierOverride;
use crate::plugins::lod::{GridZoomThresholds, HoleLodThresholds};

pub const CONFIG_PATH: &str = "assets/config/forge.ron";

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("config read failed for {path}: {source}")]
    ConfigRead { path: String, source: std::io::Error },
    #[error("config parse failed: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
    #[error("invalid argument {0:?}")]
    InvalidArgument(String),
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct HallDef {
    pub width: f32,
    pub length: f32,
    pub wall_height: f32,
    pub wall_thickness: f32,
}
impl Default for HallDef {
    fn default() -> Self {
        Self { width: 10.0, length: 20.0, wall_height: 1.2, wall_thickness: 0.2 }
    }
}

#[derive(Debug, Deserialize, Resource, Clone)]
#[serde(default)]
pub struct ForgeConfig {
    pub hall: HallDef,
    pub tier_override: TierOverride,
    pub store_path: String,
    pub grid_zoom: GridZoomThresholds,
    pub hole_lod: HoleLodThresholds,
    pub initial_view: ViewMode,
    pub initial_uv_mode: bool,
    pub initial_zoom: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Windmill blade speed in radians per second.
    pub windmill_speed: f32,
    pub seed_demo_course: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            hall: HallDef::default(),
            tier_override: TierOverride::Auto,
            store_path: "golf_forge_store.ron".into(),
            grid_zoom: GridZoomThresholds::default(),
            hole_lod: HoleLodThresholds::default(),
            initial_view: ViewMode::Top,
            initial_uv_mode: false,
            initial_zoom: 20.0,
            zoom_min: 2.0,
            zoom_max: 120.0,
            windmill_speed: 1.2,
            seed_demo_course: true,
        }
    }
}

impl ForgeConfig {
    pub fn from_ron(data: &str) -> Result<Self, ForgeError> {
        Ok(ron::from_str::<ForgeConfig>(data)?)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: &str) -> Result<Self, ForgeError> {
        let data = fs::read_to_string(path)
            .map_err(|source| ForgeError::ConfigRead { path: path.to_owned(), source })?;
        Self::from_ron(&data)
    }

    /// Loads the config the platform way, falling back to defaults.
    pub fn load() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            // No filesystem in the browser; the file is embedded at compile time.
            let data = include_str!("../../assets/config/forge.ron");
            return match Self::from_ron(data) {
                Ok(cfg) => cfg,
                Err(e) => {
                    error!("CONFIG embedded parse failed: {e}");
                    Self::default()
                }
            };
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            match Self::from_file(CONFIG_PATH) {
                Ok(cfg) => cfg,
                Err(ForgeError::ConfigRead { path, .. }) => {
                    info!("CONFIG missing path={path} using=defaults");
                    Self::default()
                }
                Err(e) => {
                    error!("CONFIG {e}; using defaults");
                    Self::default()
                }
            }
        }
    }

    /// Relative store paths live next to the config file.
    pub fn resolved_store_path(&self) -> PathBuf {
        let path = Path::new(&self.store_path);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        Path::new(CONFIG_PATH).parent().unwrap_or(Path::new("")).join(path)
    }

    /// Applies `--tier=..`, `--view=..` and `--uv` style flags. Unknown flags
    /// are ignored; malformed values are reported.
    pub fn apply_args<I, S>(&mut self, args: I) -> Result<(), ForgeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            let arg = arg.as_ref();
            if let Some(v) = arg.strip_prefix("--tier=") {
                self.tier_override = v.parse().map_err(|_| ForgeError::InvalidArgument(arg.to_owned()))?;
            } else if let Some(v) = arg.strip_prefix("--view=") {
                self.initial_view = match v {
                    "top" => ViewMode::Top,
                    "3d" => ViewMode::ThreeD,
                    _ => return Err(ForgeError::InvalidArgument(arg.to_owned())),
                };
            } else if arg == "--uv" {
                self.initial_uv_mode = true;
            }
        }
        Ok(())
    }
}

/// Loads `ForgeConfig` and applies command-line flags, unless a config was
/// inserted before the plugin was added.
pub struct ConfigPlugin;
impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        if app.world().contains_resource::<ForgeConfig>() { return; }
        let mut config = ForgeConfig::load();
        if let Err(e) = config.apply_args(std::env::args().skip(1)) {
            error!("CONFIG {e}");
        }
        info!(
            "CONFIG hall={}x{} tier_override={} view={:?} uv={}",
            config.hall.width,
            config.hall.length,
            config.tier_override.as_str(),
            config.initial_view,
            config.initial_uv_mode
        );
        app.insert_resource(config);
    }
}
