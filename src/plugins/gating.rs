// Feature gates: total functions from tier / mode / view onto "is this visual
// feature active". No state lives here.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::plugins::gpu_tier::GpuTier;

/// Below this performance factor the renderer is struggling and drops extras.
pub const PERF_DEGRADE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Top,
    ThreeD,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Top => ViewMode::ThreeD,
            ViewMode::ThreeD => ViewMode::Top,
        }
    }
    pub fn is_top_down(self) -> bool {
        self == ViewMode::Top
    }
}

pub fn texture_load_gate(tier: GpuTier) -> bool {
    tier != GpuTier::Low
}

/// Which texture maps a material should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureMapSelection {
    pub color: bool,
    pub normal: bool,
    pub roughness: bool,
}

impl TextureMapSelection {
    pub const NONE: Self = Self { color: false, normal: false, roughness: false };

    pub fn any(&self) -> bool {
        self.color || self.normal || self.roughness
    }
}

pub fn texture_map_selection(tier: GpuTier, is_top_down: bool) -> TextureMapSelection {
    match tier {
        GpuTier::Low => TextureMapSelection::NONE,
        // normal / roughness detail is invisible under an orthographic top view
        _ if is_top_down => TextureMapSelection { color: true, normal: false, roughness: false },
        GpuTier::Mid => TextureMapSelection { color: true, normal: true, roughness: false },
        GpuTier::High => TextureMapSelection { color: true, normal: true, roughness: true },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PostEffect {
    Bloom,
    Vignette,
    ToneMapping,
    ChromaticAberration,
    N8ao,
    GodRays,
}

pub fn post_processing_effect_set(tier: GpuTier, has_light_source: bool) -> BTreeSet<PostEffect> {
    let mut set = BTreeSet::from([PostEffect::Bloom, PostEffect::Vignette, PostEffect::ToneMapping]);
    if tier != GpuTier::Low {
        set.insert(PostEffect::ChromaticAberration);
    }
    if tier == GpuTier::High {
        set.insert(PostEffect::N8ao);
        if has_light_source {
            set.insert(PostEffect::GodRays);
        }
    }
    set
}

pub fn reflective_floor_gate(uv_mode: bool, view: ViewMode, tier: GpuTier, perf_current: f32) -> bool {
    uv_mode && view == ViewMode::ThreeD && tier != GpuTier::Low && perf_current >= PERF_DEGRADE_THRESHOLD
}

pub fn reflector_resolution(tier: GpuTier) -> u32 {
    match tier {
        GpuTier::High => 512,
        _ => 256,
    }
}

pub fn flag_pin_visible(view: ViewMode) -> bool {
    view == ViewMode::ThreeD
}

pub fn use_simplified_bumpers(view: ViewMode) -> bool {
    view == ViewMode::Top
}

pub fn skip_normal_map(view: ViewMode) -> bool {
    view == ViewMode::Top
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureCategory {
    Felt,
    Wood,
    Rubber,
    Concrete,
}

impl TextureCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TextureCategory::Felt => "felt",
            TextureCategory::Wood => "wood",
            TextureCategory::Rubber => "rubber",
            TextureCategory::Concrete => "concrete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureMap {
    Color,
    Normal,
    Roughness,
}

impl TextureMap {
    pub fn as_str(self) -> &'static str {
        match self {
            TextureMap::Color => "color",
            TextureMap::Normal => "normal",
            TextureMap::Roughness => "roughness",
        }
    }
}

pub fn texture_path(category: TextureCategory, map: TextureMap) -> String {
    format!("textures/{0}/{0}_{1}.png", category.as_str(), map.as_str())
}

/// Paths for the maps enabled in `selection`, in color / normal / roughness order.
pub fn texture_paths_for(category: TextureCategory, selection: TextureMapSelection) -> Vec<(TextureMap, String)> {
    [
        (TextureMap::Color, selection.color),
        (TextureMap::Normal, selection.normal),
        (TextureMap::Roughness, selection.roughness),
    ]
    .into_iter()
    .filter(|(_, on)| *on)
    .map(|(map, _)| (map, texture_path(category, map)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIERS: [GpuTier; 3] = [GpuTier::Low, GpuTier::Mid, GpuTier::High];

    #[test]
    fn texture_gate_only_blocks_low() {
        assert!(!texture_load_gate(GpuTier::Low));
        assert!(texture_load_gate(GpuTier::Mid));
        assert!(texture_load_gate(GpuTier::High));
    }

    #[test]
    fn texture_maps_by_tier_and_view() {
        assert_eq!(
            texture_map_selection(GpuTier::High, true),
            TextureMapSelection { color: true, normal: false, roughness: false }
        );
        assert_eq!(
            texture_map_selection(GpuTier::Mid, false),
            TextureMapSelection { color: true, normal: true, roughness: false }
        );
        assert_eq!(
            texture_map_selection(GpuTier::High, false),
            TextureMapSelection { color: true, normal: true, roughness: true }
        );
        assert_eq!(texture_map_selection(GpuTier::Low, true), TextureMapSelection::NONE);
        assert_eq!(texture_map_selection(GpuTier::Low, false), TextureMapSelection::NONE);
    }

    #[test]
    fn post_effects_grow_with_tier() {
        let low = post_processing_effect_set(GpuTier::Low, true);
        assert_eq!(low, BTreeSet::from([PostEffect::Bloom, PostEffect::Vignette, PostEffect::ToneMapping]));

        let mid = post_processing_effect_set(GpuTier::Mid, true);
        assert!(mid.contains(&PostEffect::ChromaticAberration));
        assert!(!mid.contains(&PostEffect::N8ao));
        assert!(!mid.contains(&PostEffect::GodRays));

        let high = post_processing_effect_set(GpuTier::High, true);
        assert_eq!(high.len(), 6);

        let high_no_light = post_processing_effect_set(GpuTier::High, false);
        assert!(high_no_light.contains(&PostEffect::N8ao));
        assert!(!high_no_light.contains(&PostEffect::GodRays));
    }

    #[test]
    fn reflective_floor_needs_full_conjunction() {
        assert!(reflective_floor_gate(true, ViewMode::ThreeD, GpuTier::Mid, 0.5));
        assert!(reflective_floor_gate(true, ViewMode::ThreeD, GpuTier::High, 1.0));
        assert!(!reflective_floor_gate(false, ViewMode::ThreeD, GpuTier::High, 1.0));
        assert!(!reflective_floor_gate(true, ViewMode::Top, GpuTier::High, 1.0));
        assert!(!reflective_floor_gate(true, ViewMode::ThreeD, GpuTier::Low, 1.0));
        assert!(!reflective_floor_gate(true, ViewMode::ThreeD, GpuTier::High, 0.499));
    }

    #[test]
    fn reflector_resolution_defaults_to_256() {
        assert_eq!(reflector_resolution(GpuTier::High), 512);
        assert_eq!(reflector_resolution(GpuTier::Mid), 256);
        assert_eq!(reflector_resolution(GpuTier::Low), 256);
    }

    #[test]
    fn view_gates() {
        assert!(flag_pin_visible(ViewMode::ThreeD));
        assert!(!flag_pin_visible(ViewMode::Top));
        assert!(use_simplified_bumpers(ViewMode::Top));
        assert!(!use_simplified_bumpers(ViewMode::ThreeD));
        assert!(skip_normal_map(ViewMode::Top));
        assert!(!skip_normal_map(ViewMode::ThreeD));
    }

    #[test]
    fn texture_paths_follow_selection() {
        assert_eq!(texture_path(TextureCategory::Felt, TextureMap::Normal), "textures/felt/felt_normal.png");
        for tier in TIERS {
            let sel = texture_map_selection(tier, false);
            let paths = texture_paths_for(TextureCategory::Wood, sel);
            let expected = [sel.color, sel.normal, sel.roughness].iter().filter(|b| **b).count();
            assert_eq!(paths.len(), expected);
        }
        assert!(texture_paths_for(TextureCategory::Rubber, TextureMapSelection::NONE).is_empty());
    }
}
