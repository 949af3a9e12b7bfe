use bevy::diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin};
use bevy::prelude::*;
use bevy::winit::WinitSettings;

use golf_forge::plugins::camera::CameraPlugin;
use golf_forge::plugins::config::ConfigPlugin;
use golf_forge::plugins::course::CoursePlugin;
use golf_forge::plugins::gpu_tier::GpuTierPlugin;
use golf_forge::plugins::grid::GridPlugin;
use golf_forge::plugins::layers::LayersPlugin;
use golf_forge::plugins::lod::LodPlugin;
use golf_forge::plugins::materials::MaterialsPlugin;
use golf_forge::plugins::obstacles::ObstaclesPlugin;
use golf_forge::plugins::opacity::OpacityPlugin;
use golf_forge::plugins::perf_monitor::PerfMonitorPlugin;
use golf_forge::plugins::planner_state::PlannerStatePlugin;
use golf_forge::plugins::post_fx::PostFxPlugin;
use golf_forge::plugins::scene::{ScenePlugin, PLAN_CLEAR};
use golf_forge::plugins::storage::StoragePlugin;

fn main() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    App::new()
        .insert_resource(ClearColor(PLAN_CLEAR))
        .insert_resource(Msaa::Sample4)
        .insert_resource(AmbientLight {
            color: Color::srgb(0.85, 0.85, 0.90),
            brightness: 400.0,
        })
        .insert_resource(WinitSettings::desktop_app())
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window { title: "Golf Forge".into(), ..default() }),
            ..default()
        }))
        .add_plugins(ConfigPlugin)        // must precede everything that reads ForgeConfig in build
        .add_plugins(StoragePlugin)       // preference store for tier cache / override
        .add_plugins(GpuTierPlugin)       // async capability detection
        .add_plugins(PlannerStatePlugin)  // view / UV flags + keyboard
        .add_plugins(CameraPlugin)        // planner camera, presets, zoom
        .add_plugins(LodPlugin)           // zoom band trackers
        .add_plugins(LayersPlugin)
        .add_plugins(OpacityPlugin)
        .add_plugins(MaterialsPlugin)
        .add_plugins(CoursePlugin)
        .add_plugins(ScenePlugin)         // hall, lights, UV lamps, flow path
        .add_plugins(ObstaclesPlugin)     // hole entities
        .add_plugins(GridPlugin)
        .add_plugins(PerfMonitorPlugin)
        .add_plugins(PostFxPlugin)
        .add_plugins(FrameTimeDiagnosticsPlugin)
        .add_plugins(LogDiagnosticsPlugin::default())
        .run();
}
