// Material registries. Hole materials are shared per render configuration and
// released as soon as no configuration in use refers to them; wall materials
// exist exactly once per mode for the whole session.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::plugins::course::HoleKind;
use crate::plugins::gating::{
    skip_normal_map, texture_load_gate, texture_map_selection, texture_path, TextureCategory, TextureMap,
    TextureMapSelection, ViewMode,
};
use crate::plugins::gpu_tier::GpuTier;

pub const UV_FELT: Color = Color::srgb(0.15, 0.05, 0.35);
pub const UV_BUMPER: Color = Color::srgb(1.0, 0.1, 0.85);
pub const PLAN_BUMPER: Color = Color::srgb(0.92, 0.92, 0.90);
pub const PLAN_WALL: Color = Color::srgb(0.78, 0.76, 0.72);
pub const UV_WALL: Color = Color::srgb(0.06, 0.04, 0.12);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    pub kind: HoleKind,
    pub uv_mode: bool,
    pub tier: GpuTier,
    pub top_down: bool,
    /// Packed sRGBA felt colour when a template overrides the kind default.
    pub tint: Option<u32>,
}

impl MaterialKey {
    pub fn new(kind: HoleKind, uv_mode: bool, tier: GpuTier, view: ViewMode) -> Self {
        Self { kind, uv_mode, tier, top_down: view.is_top_down(), tint: None }
    }

    pub fn with_tint(mut self, color: Color) -> Self {
        self.tint = Some(u32::from_be_bytes(srgba_bytes(color)));
        self
    }

    fn felt_color(&self) -> Color {
        match self.tint {
            Some(packed) => {
                let [r, g, b, a] = packed.to_be_bytes();
                Color::srgba_u8(r, g, b, a)
            }
            None => self.kind.default_color(),
        }
    }

    fn view(&self) -> ViewMode {
        if self.top_down { ViewMode::Top } else { ViewMode::ThreeD }
    }
}

fn srgba_bytes(color: Color) -> [u8; 4] {
    let c = color.to_srgba();
    [c.red, c.green, c.blue, c.alpha].map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[derive(Debug, Clone)]
pub struct MaterialSet {
    pub felt: Handle<StandardMaterial>,
    pub bumper: Handle<StandardMaterial>,
    pub tee: Handle<StandardMaterial>,
    pub cup: Handle<StandardMaterial>,
    /// Obstacle bodies (windmill, tunnel, loop, ramp).
    pub accent: Handle<StandardMaterial>,
    pub maps: TextureMapSelection,
    pub is_top_down: bool,
}

impl MaterialSet {
    pub fn ids(&self) -> [AssetId<StandardMaterial>; 5] {
        [self.felt.id(), self.bumper.id(), self.tee.id(), self.cup.id(), self.accent.id()]
    }
}

/// Texture maps for one category, present only for the maps the tier allows.
#[derive(Debug, Clone, Default)]
pub struct TextureSet {
    pub color: Option<Handle<Image>>,
    pub normal: Option<Handle<Image>>,
    pub roughness: Option<Handle<Image>>,
}

impl TextureSet {
    pub fn apply(&self, mat: &mut StandardMaterial) {
        mat.base_color_texture = self.color.clone();
        mat.normal_map_texture = self.normal.clone();
        mat.metallic_roughness_texture = self.roughness.clone();
    }
}

/// Loads texture maps on demand and keeps one handle per path.
#[derive(Resource, Default)]
pub struct TextureLibrary {
    loaded: HashMap<(TextureCategory, TextureMap), Handle<Image>>,
}

impl TextureLibrary {
    pub fn textures_for(
        &mut self,
        server: Option<&AssetServer>,
        category: TextureCategory,
        tier: GpuTier,
        view: ViewMode,
    ) -> TextureSet {
        let Some(server) = server else { return TextureSet::default(); };
        if !texture_load_gate(tier) { return TextureSet::default(); }
        let selection = texture_map_selection(tier, view.is_top_down());
        let mut load = |map: TextureMap| {
            self.loaded
                .entry((category, map))
                .or_insert_with(|| server.load(texture_path(category, map)))
                .clone()
        };
        TextureSet {
            color: selection.color.then(|| load(TextureMap::Color)),
            normal: (selection.normal && !skip_normal_map(view)).then(|| load(TextureMap::Normal)),
            roughness: selection.roughness.then(|| load(TextureMap::Roughness)),
        }
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

pub fn felt_material(key: &MaterialKey, textures: &TextureSet) -> StandardMaterial {
    if key.uv_mode {
        return StandardMaterial {
            base_color: UV_FELT,
            emissive: LinearRgba::from(key.felt_color()) * 0.4,
            perceptual_roughness: 0.95,
            ..default()
        };
    }
    let mut mat = StandardMaterial {
        base_color: key.felt_color(),
        perceptual_roughness: 0.9,
        ..default()
    };
    if key.tier != GpuTier::Low {
        textures.apply(&mut mat);
    }
    mat
}

pub fn bumper_material(key: &MaterialKey, textures: &TextureSet) -> StandardMaterial {
    if key.uv_mode {
        return StandardMaterial {
            base_color: UV_BUMPER,
            emissive: LinearRgba::from(UV_BUMPER) * 2.0,
            ..default()
        };
    }
    let mut mat = StandardMaterial { base_color: PLAN_BUMPER, perceptual_roughness: 0.6, ..default() };
    if key.tier != GpuTier::Low && !key.top_down {
        textures.apply(&mut mat);
    }
    mat
}

pub fn tee_material(key: &MaterialKey) -> StandardMaterial {
    if key.uv_mode {
        let c = Color::srgb(0.2, 1.0, 0.4);
        return StandardMaterial { base_color: c, emissive: LinearRgba::from(c) * 2.0, ..default() };
    }
    StandardMaterial { base_color: Color::srgb(0.95, 0.95, 0.95), perceptual_roughness: 0.7, ..default() }
}

pub fn cup_material(key: &MaterialKey) -> StandardMaterial {
    if key.uv_mode {
        let c = Color::srgb(1.0, 0.9, 0.1);
        return StandardMaterial { base_color: c, emissive: LinearRgba::from(c) * 2.0, ..default() };
    }
    StandardMaterial { base_color: Color::srgb(0.05, 0.05, 0.05), perceptual_roughness: 0.4, ..default() }
}

pub fn accent_material(key: &MaterialKey) -> StandardMaterial {
    let base = key.kind.default_color().to_srgba();
    let accent = Color::srgb(1.0 - base.red * 0.5, 1.0 - base.green * 0.5, 1.0 - base.blue * 0.5);
    if key.uv_mode {
        StandardMaterial { base_color: accent, emissive: LinearRgba::from(accent) * 1.5, ..default() }
    } else {
        StandardMaterial { base_color: accent, perceptual_roughness: 0.5, metallic: 0.1, ..default() }
    }
}

/// Shared hole materials keyed by render configuration.
#[derive(Resource, Default)]
pub struct MaterialCache {
    entries: HashMap<MaterialKey, MaterialSet>,
}

impl MaterialCache {
    pub fn get_or_create(
        &mut self,
        key: MaterialKey,
        materials: &mut Assets<StandardMaterial>,
        textures: &mut TextureLibrary,
        server: Option<&AssetServer>,
    ) -> MaterialSet {
        if let Some(set) = self.entries.get(&key) {
            return set.clone();
        }
        let felt_tex = textures.textures_for(server, TextureCategory::Felt, key.tier, key.view());
        let rubber_tex = textures.textures_for(server, TextureCategory::Rubber, key.tier, key.view());
        let set = MaterialSet {
            felt: materials.add(felt_material(&key, &felt_tex)),
            bumper: materials.add(bumper_material(&key, &rubber_tex)),
            tee: materials.add(tee_material(&key)),
            cup: materials.add(cup_material(&key)),
            accent: materials.add(accent_material(&key)),
            maps: TextureMapSelection {
                color: felt_tex.color.is_some(),
                normal: felt_tex.normal.is_some(),
                roughness: felt_tex.roughness.is_some(),
            },
            is_top_down: key.top_down,
        };
        debug!("MATERIALS created key={:?}", key);
        self.entries.insert(key, set.clone());
        set
    }

    /// Drops every entry outside `in_use` and removes its assets. Returns the
    /// number of entries released.
    pub fn retain_only(&mut self, in_use: &HashSet<MaterialKey>, materials: &mut Assets<StandardMaterial>) -> usize {
        let stale: Vec<MaterialKey> = self.entries.keys().filter(|k| !in_use.contains(k)).copied().collect();
        for key in &stale {
            if let Some(set) = self.entries.remove(key) {
                for id in set.ids() {
                    materials.remove(id);
                }
            }
        }
        stale.len()
    }

    pub fn contains(&self, key: &MaterialKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exactly one wall material per mode.
#[derive(Resource, Debug, Clone)]
pub struct WallMaterials {
    pub plan: Handle<StandardMaterial>,
    pub uv: Handle<StandardMaterial>,
}

impl WallMaterials {
    pub fn create(materials: &mut Assets<StandardMaterial>) -> Self {
        Self {
            plan: materials.add(StandardMaterial { base_color: PLAN_WALL, perceptual_roughness: 0.85, ..default() }),
            uv: materials.add(StandardMaterial {
                base_color: UV_WALL,
                emissive: LinearRgba::rgb(0.05, 0.0, 0.12),
                perceptual_roughness: 0.9,
                ..default()
            }),
        }
    }

    pub fn for_mode(&self, uv_mode: bool) -> Handle<StandardMaterial> {
        if uv_mode { self.uv.clone() } else { self.plan.clone() }
    }
}

pub struct MaterialsPlugin;
impl Plugin for MaterialsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MaterialCache>()
            .init_resource::<TextureLibrary>()
            .add_systems(PreStartup, create_wall_materials);
    }
}

fn create_wall_materials(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    commands.insert_resource(WallMaterials::create(&mut materials));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(uv: bool) -> MaterialKey {
        MaterialKey::new(HoleKind::Windmill, uv, GpuTier::Mid, ViewMode::ThreeD)
    }

    #[test]
    fn cache_shares_sets_per_key() {
        let mut assets = Assets::<StandardMaterial>::default();
        let mut textures = TextureLibrary::default();
        let mut cache = MaterialCache::default();
        let a = cache.get_or_create(key(false), &mut assets, &mut textures, None);
        let b = cache.get_or_create(key(false), &mut assets, &mut textures, None);
        assert_eq!(a.felt.id(), b.felt.id());
        assert_eq!(assets.len(), 5);
        assert!(!a.is_top_down);
        assert_eq!(a.maps, TextureMapSelection::NONE);
        cache.get_or_create(key(true), &mut assets, &mut textures, None);
        assert_eq!(cache.len(), 2);
        assert_eq!(assets.len(), 10);
    }

    #[test]
    fn retain_only_releases_stale_assets() {
        let mut assets = Assets::<StandardMaterial>::default();
        let mut textures = TextureLibrary::default();
        let mut cache = MaterialCache::default();
        let plan = cache.get_or_create(key(false), &mut assets, &mut textures, None);
        cache.get_or_create(key(true), &mut assets, &mut textures, None);
        let released = cache.retain_only(&HashSet::from([key(true)]), &mut assets);
        assert_eq!(released, 1);
        assert!(!cache.contains(&key(false)));
        assert!(assets.get(plan.felt.id()).is_none());
        assert!(assets.get(plan.cup.id()).is_none());
        assert_eq!(assets.len(), 5);
    }

    #[test]
    fn tint_round_trips_through_key() {
        let tinted = key(false).with_tint(Color::srgb_u8(200, 30, 40));
        assert_ne!(tinted, key(false));
        let mat = felt_material(&tinted, &TextureSet::default());
        assert_eq!(srgba_bytes(mat.base_color), [200, 30, 40, 255]);
    }

    #[test]
    fn uv_materials_glow() {
        let mat = bumper_material(&key(true), &TextureSet::default());
        assert!(mat.emissive.red > 0.0);
        let plan = bumper_material(&key(false), &TextureSet::default());
        assert_eq!(plan.emissive, LinearRgba::BLACK);
    }

    #[test]
    fn wall_registry_holds_one_per_mode() {
        let mut assets = Assets::<StandardMaterial>::default();
        let walls = WallMaterials::create(&mut assets);
        assert_eq!(assets.len(), 2);
        assert_eq!(walls.for_mode(false).id(), walls.plan.id());
        assert_eq!(walls.for_mode(true).id(), walls.uv.id());
    }

    #[test]
    fn no_textures_without_server() {
        let mut lib = TextureLibrary::default();
        let set = lib.textures_for(None, TextureCategory::Felt, GpuTier::High, ViewMode::ThreeD);
        assert!(set.color.is_none() && set.normal.is_none());
        assert!(lib.is_empty());
    }
}
