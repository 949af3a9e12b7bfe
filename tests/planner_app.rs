use bevy::color::Alpha;
use bevy::core_pipeline::bloom::BloomSettings;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;
use bevy::winit::{UpdateMode, WinitSettings};
use golf_forge::plugins::course::HoleEntity;
use golf_forge::plugins::gating::PostEffect;
use golf_forge::plugins::gpu_tier::{TierDetection, TIER_CACHE_KEY};
use golf_forge::plugins::grid::{ActiveGridSpacing, GridLabelText, GridPlugin, GridSpacing};
use golf_forge::plugins::lod::{GridBandTracker, HoleLodTracker};
use golf_forge::plugins::materials::MaterialKey;
use golf_forge::plugins::scene::{FloorMaterials, HallFloor, UvLamp};
use golf_forge::prelude::*;

// Headless config: no demo holes, defaults elsewhere.
fn test_config() -> ForgeConfig {
    ForgeConfig { seed_demo_course: false, ..default() }
}

fn base_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(test_config())
        .insert_resource(PreferenceStore::memory());
    app
}

fn asset_app() -> App {
    let mut app = base_app();
    app.add_plugins(AssetPlugin::default())
        .init_asset::<Mesh>()
        .init_asset::<StandardMaterial>()
        .init_asset::<Image>();
    app
}

#[test]
fn detection_without_adapter_keeps_low() {
    let mut app = base_app();
    app.add_plugins(GpuTierPlugin);
    for _ in 0..50 {
        app.update();
        if !app.world().contains_resource::<TierDetection>() { break; }
    }
    assert!(!app.world().contains_resource::<TierDetection>());
    let state = app.world().resource::<GpuTierState>();
    assert_eq!(state.effective(), GpuTier::Low);
    assert_eq!(state.source, TierSource::Default);
    let store = app.world().resource::<PreferenceStore>();
    assert_eq!(store.read(TIER_CACHE_KEY), None);
}

#[test]
fn cached_tier_skips_detection() {
    let mut app = base_app();
    app.world_mut().resource_mut::<PreferenceStore>().write(TIER_CACHE_KEY, "high");
    app.add_plugins(GpuTierPlugin);
    app.update();
    assert!(!app.world().contains_resource::<TierDetection>());
    let state = app.world().resource::<GpuTierState>();
    assert_eq!(state.detected, GpuTier::High);
    assert_eq!(state.source, TierSource::Cache);
}

#[test]
fn configured_override_wins_over_cache() {
    let mut app = base_app();
    app.insert_resource(ForgeConfig { tier_override: TierOverride::Mid, ..test_config() });
    app.world_mut().resource_mut::<PreferenceStore>().write(TIER_CACHE_KEY, "low");
    app.add_plugins(GpuTierPlugin);
    app.update();
    assert_eq!(app.world().resource::<GpuTierState>().effective(), GpuTier::Mid);
}

#[test]
fn zoom_changes_move_both_trackers() {
    let mut app = base_app();
    app.add_plugins(LodPlugin);
    let cam = app.world_mut().spawn(PlannerCamera { zoom: 5.0 }).id();
    app.update();
    assert_eq!(app.world().resource::<GridBandTracker>().0.current(), Some(ZoomBand::Far));
    assert_eq!(app.world().resource::<HoleLodTracker>().0.current(), Some(LodLevel::Overview));

    app.world_mut().get_mut::<PlannerCamera>(cam).unwrap().zoom = 40.0;
    app.update();
    assert_eq!(app.world().resource::<GridBandTracker>().0.current(), Some(ZoomBand::Close));
    assert_eq!(app.world().resource::<HoleLodTracker>().0.current(), Some(LodLevel::Detail));
}

#[test]
fn grid_rebuilds_on_band_change_without_leaking_meshes() {
    let mut app = asset_app();
    app.add_plugins((LodPlugin, GridPlugin));
    let cam = app.world_mut().spawn(PlannerCamera { zoom: 5.0 }).id();
    app.update();
    assert_eq!(app.world().resource::<ActiveGridSpacing>().0, GridSpacing { major: 5.0, minor: None });
    let labels = app.world_mut().query::<&GridLabelText>().iter(app.world()).count();
    assert_eq!(labels, 3 + 5);
    assert_eq!(app.world().resource::<Assets<Mesh>>().len(), 2);
    let line_mats = app.world().resource::<Assets<StandardMaterial>>();
    assert_eq!(line_mats.len(), 2);
    for (_, m) in line_mats.iter() {
        assert_eq!(m.alpha_mode, AlphaMode::Blend);
        assert!(m.base_color.alpha() < 1.0);
    }

    app.world_mut().get_mut::<PlannerCamera>(cam).unwrap().zoom = 35.0;
    app.update();
    assert_eq!(app.world().resource::<ActiveGridSpacing>().0, GridSpacing { major: 1.0, minor: Some(0.25) });
    assert_eq!(app.world().resource::<Assets<Mesh>>().len(), 2);
    let labels = app.world_mut().query::<&GridLabelText>().iter(app.world()).count();
    assert_eq!(labels, 11 + 21);
}

#[test]
fn layer_opacity_fades_and_restores_group() {
    let mut app = asset_app();
    app.add_plugins((LayersPlugin, OpacityPlugin));
    let mat = app
        .world_mut()
        .resource_mut::<Assets<StandardMaterial>>()
        .add(StandardMaterial { base_color: Color::srgb(0.3, 0.3, 0.3), ..default() });
    let child = app.world_mut().spawn(mat.clone()).id();
    app.world_mut().spawn(LayerRoot(LayerId::Walls)).add_child(child);
    app.update();

    app.world_mut().resource_mut::<LayerStates>().set_opacity(LayerId::Walls, 0.3);
    app.update();
    {
        let m = app.world().resource::<Assets<StandardMaterial>>().get(&mat).unwrap();
        assert_eq!(m.alpha_mode, AlphaMode::Blend);
        assert!((m.base_color.alpha() - 0.3).abs() < 1e-6);
    }

    app.world_mut().resource_mut::<LayerStates>().reset();
    app.update();
    let m = app.world().resource::<Assets<StandardMaterial>>().get(&mat).unwrap();
    assert_eq!(m.alpha_mode, AlphaMode::Opaque);
    assert_eq!(m.base_color.alpha(), 1.0);
}

fn hole_app() -> App {
    let mut app = asset_app();
    app.insert_resource(PlannerState::default())
        .init_resource::<GpuTierState>()
        .add_plugins((LodPlugin, CoursePlugin, MaterialsPlugin, ObstaclesPlugin));
    app
}

fn hole_count(app: &mut App) -> usize {
    app.world_mut().query::<&HoleEntity>().iter(app.world()).count()
}

#[test]
fn holes_follow_course_and_release_assets() {
    let mut app = hole_app();
    let (a, _b) = {
        let mut course = app.world_mut().resource_mut::<Course>();
        (course.add_hole(HoleKind::Windmill, Vec2::new(2.0, 3.0)), course.add_hole(HoleKind::Loop, Vec2::new(6.0, 3.0)))
    };
    app.update();
    assert_eq!(hole_count(&mut app), 2);
    assert_eq!(app.world().resource::<MaterialCache>().len(), 2);
    let meshes_two = app.world().resource::<Assets<Mesh>>().len();
    assert!(meshes_two > 0);

    app.world_mut().resource_mut::<Course>().remove_hole(a);
    app.update();
    assert_eq!(hole_count(&mut app), 1);
    assert_eq!(app.world().resource::<MaterialCache>().len(), 1);
    assert!(app.world().resource::<Assets<Mesh>>().len() < meshes_two);
}

#[test]
fn uv_toggle_swaps_material_sets() {
    let mut app = hole_app();
    app.world_mut().resource_mut::<Course>().add_hole(HoleKind::Straight, Vec2::new(2.0, 3.0));
    app.update();
    let plan_key = MaterialKey::new(HoleKind::Straight, false, GpuTier::Low, ViewMode::Top);
    assert!(app.world().resource::<MaterialCache>().contains(&plan_key));

    app.world_mut().resource_mut::<PlannerState>().uv_mode = true;
    app.update();
    let cache = app.world().resource::<MaterialCache>();
    assert!(!cache.contains(&plan_key));
    assert!(cache.contains(&MaterialKey::new(HoleKind::Straight, true, GpuTier::Low, ViewMode::Top)));
    assert_eq!(cache.len(), 1);
    assert_eq!(hole_count(&mut app), 1);
}

#[test]
fn moving_a_hole_keeps_its_entity() {
    let mut app = hole_app();
    let id = app.world_mut().resource_mut::<Course>().add_hole(HoleKind::Ramp, Vec2::new(2.0, 3.0));
    app.update();
    let before: Vec<Entity> = app.world_mut().query_filtered::<Entity, With<HoleEntity>>().iter(app.world()).collect();
    app.world_mut().resource_mut::<Course>().move_hole(id, Vec2::new(5.0, 7.0));
    app.update();
    let after: Vec<(Entity, Transform)> = app
        .world_mut()
        .query_filtered::<(Entity, &Transform), With<HoleEntity>>()
        .iter(app.world())
        .map(|(e, t)| (e, *t))
        .collect();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].0, before[0]);
    assert_eq!(after[0].1.translation, Vec3::new(5.0, 0.0, 7.0));
}

fn scene_app() -> App {
    let mut app = asset_app();
    app.insert_resource(PlannerState::default())
        .init_resource::<GpuTierState>()
        .init_resource::<Course>()
        .add_plugins((MaterialsPlugin, ScenePlugin));
    app
}

fn floor_handle(app: &mut App) -> Handle<StandardMaterial> {
    app.world_mut()
        .query_filtered::<&Handle<StandardMaterial>, With<HallFloor>>()
        .single(app.world())
        .clone()
}

fn set_tier(app: &mut App, tier: GpuTier) {
    app.world_mut().resource_mut::<GpuTierState>().detected = tier;
}

#[test]
fn floor_follows_tier_and_mode() {
    let mut app = scene_app();
    app.update();
    let floors = app.world().resource::<FloorMaterials>().clone();
    assert_eq!(floor_handle(&mut app), floors.flat);
    assert_eq!(*app.world().resource::<ReflectorSettings>(), ReflectorSettings { enabled: false, resolution: 256 });

    set_tier(&mut app, GpuTier::Mid);
    app.update();
    assert_eq!(floor_handle(&mut app), floors.textured);

    *app.world_mut().resource_mut::<PlannerState>() = PlannerState { view: ViewMode::ThreeD, uv_mode: true };
    app.update();
    assert_eq!(floor_handle(&mut app), floors.reflective);
    assert_eq!(*app.world().resource::<ReflectorSettings>(), ReflectorSettings { enabled: true, resolution: 256 });

    set_tier(&mut app, GpuTier::High);
    app.update();
    assert_eq!(floor_handle(&mut app), floors.reflective);
    assert_eq!(app.world().resource::<ReflectorSettings>().resolution, 512);
}

#[test]
fn uv_lamps_live_under_environment_and_release_assets() {
    let mut app = scene_app();
    app.update();
    assert_eq!(app.world_mut().query::<&UvLamp>().iter(app.world()).count(), 0);

    app.world_mut().resource_mut::<PlannerState>().uv_mode = true;
    app.update();
    let env = app
        .world_mut()
        .query::<(Entity, &LayerRoot)>()
        .iter(app.world())
        .find(|(_, l)| l.0 == LayerId::Environment)
        .map(|(e, _)| e)
        .unwrap();
    let lamps: Vec<(Entity, AssetId<Mesh>, AssetId<StandardMaterial>)> = app
        .world_mut()
        .query_filtered::<(Entity, &Handle<Mesh>, &Handle<StandardMaterial>), With<UvLamp>>()
        .iter(app.world())
        .map(|(e, m, mat)| (e, m.id(), mat.id()))
        .collect();
    assert_eq!(lamps.len(), 5);
    for (e, _, _) in &lamps {
        assert_eq!(app.world().get::<Parent>(*e).map(|p| p.get()), Some(env));
    }
    let (_, mesh_id, mat_id) = lamps[0];
    assert!(app.world().resource::<Assets<Mesh>>().get(mesh_id).is_some());

    app.world_mut().resource_mut::<PlannerState>().uv_mode = false;
    app.update();
    assert_eq!(app.world_mut().query::<&UvLamp>().iter(app.world()).count(), 0);
    assert!(app.world().resource::<Assets<Mesh>>().get(mesh_id).is_none());
    assert!(app.world().resource::<Assets<StandardMaterial>>().get(mat_id).is_none());
}

#[test]
fn uv_mode_drives_camera_effects_and_render_loop() {
    let mut app = base_app();
    app.insert_resource(PlannerState::default())
        .insert_resource(GpuTierState { detected: GpuTier::Mid, ..default() })
        .insert_resource(WinitSettings::desktop_app())
        .init_resource::<PerfMonitor>()
        .add_plugins(PostFxPlugin);
    let cam = app.world_mut().spawn((PlannerCamera { zoom: 20.0 }, Tonemapping::TonyMcMapface)).id();
    app.update();
    assert_eq!(app.world().get::<Tonemapping>(cam), Some(&Tonemapping::None));
    assert!(app.world().get::<BloomSettings>(cam).is_none());
    assert!(matches!(app.world().resource::<WinitSettings>().focused_mode, UpdateMode::Reactive { .. }));
    assert!(app.world().resource::<PerfMonitor>().is_paused());

    app.world_mut().resource_mut::<PlannerState>().uv_mode = true;
    app.update();
    assert!(app.world().resource::<ActivePostEffects>().contains(PostEffect::Bloom));
    assert_eq!(app.world().get::<Tonemapping>(cam), Some(&Tonemapping::TonyMcMapface));
    assert!(app.world().get::<BloomSettings>(cam).is_some());
    assert!(matches!(app.world().resource::<WinitSettings>().focused_mode, UpdateMode::Continuous));
    assert!(!app.world().resource::<PerfMonitor>().is_paused());

    app.world_mut().resource_mut::<PlannerState>().uv_mode = false;
    app.update();
    assert!(app.world().resource::<ActivePostEffects>().0.is_empty());
    assert_eq!(app.world().get::<Tonemapping>(cam), Some(&Tonemapping::None));
    assert!(app.world().get::<BloomSettings>(cam).is_none());
    assert!(matches!(app.world().resource::<WinitSettings>().focused_mode, UpdateMode::Reactive { .. }));
    assert!(app.world().resource::<PerfMonitor>().is_paused());
}
