// Group opacity: fades every material under a layer root while remembering
// each material's original transparency so it can be put back exactly.
//
// Originals are keyed by `AssetId`, which does not keep the material alive;
// entries are dropped when the asset store reports the material removed.

use std::collections::{HashMap, HashSet};

use bevy::color::Alpha;
use bevy::hierarchy::HierarchyQueryExt;
use bevy::prelude::*;

use crate::plugins::layers::{LayerRoot, LayerStates};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialOriginal {
    pub alpha_mode: AlphaMode,
    pub alpha: f32,
}

#[derive(Debug, Default)]
pub struct OpacityManager {
    originals: HashMap<AssetId<StandardMaterial>, MaterialOriginal>,
}

impl OpacityManager {
    /// Applies `opacity` to each distinct material once. An opacity of 1 (or
    /// more) restores instead of mutating.
    pub fn apply<I>(&mut self, materials: I, opacity: f32, assets: &mut Assets<StandardMaterial>)
    where
        I: IntoIterator<Item = AssetId<StandardMaterial>>,
    {
        if opacity >= 1.0 {
            self.restore(assets);
            return;
        }
        let opacity = opacity.max(0.0);
        let mut seen = HashSet::new();
        for id in materials {
            if !seen.insert(id) { continue; }
            let Some(mat) = assets.get_mut(id) else { continue; };
            self.originals.entry(id).or_insert(MaterialOriginal {
                alpha_mode: mat.alpha_mode,
                alpha: mat.base_color.alpha(),
            });
            mat.alpha_mode = AlphaMode::Blend;
            mat.base_color.set_alpha(opacity);
        }
    }

    /// Puts back every captured value and forgets it.
    pub fn restore(&mut self, assets: &mut Assets<StandardMaterial>) {
        for (id, original) in self.originals.drain() {
            if let Some(mat) = assets.get_mut(id) {
                mat.alpha_mode = original.alpha_mode;
                mat.base_color.set_alpha(original.alpha);
            }
        }
    }

    pub fn original(&self, id: AssetId<StandardMaterial>) -> Option<MaterialOriginal> {
        self.originals.get(&id).copied()
    }

    pub fn forget(&mut self, id: AssetId<StandardMaterial>) {
        self.originals.remove(&id);
    }

    pub fn tracked(&self) -> usize {
        self.originals.len()
    }
}

/// One manager per layer root entity.
#[derive(Resource, Default)]
pub struct GroupOpacity {
    groups: HashMap<Entity, OpacityManager>,
}

impl GroupOpacity {
    pub fn group(&self, root: Entity) -> Option<&OpacityManager> {
        self.groups.get(&root)
    }
}

/// Materials on `root` and all of its descendants, in traversal order.
pub fn collect_group_materials(
    root: Entity,
    q_children: &Query<&Children>,
    q_mats: &Query<&Handle<StandardMaterial>>,
) -> Vec<AssetId<StandardMaterial>> {
    std::iter::once(root)
        .chain(q_children.iter_descendants(root))
        .filter_map(|e| q_mats.get(e).ok().map(|h| h.id()))
        .collect()
}

pub struct OpacityPlugin;
impl Plugin for OpacityPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GroupOpacity>()
            .add_systems(PostUpdate, (evict_removed_materials, restore_unmounted_groups, apply_layer_opacity).chain());
    }
}

fn apply_layer_opacity(
    layers: Res<LayerStates>,
    mut groups: ResMut<GroupOpacity>,
    mut assets: ResMut<Assets<StandardMaterial>>,
    q_roots: Query<(Entity, &LayerRoot)>,
    q_children: Query<&Children>,
    q_mats: Query<&Handle<StandardMaterial>>,
    q_new_mats: Query<(), Changed<Handle<StandardMaterial>>>,
) {
    if !layers.is_changed() && q_new_mats.is_empty() { return; }
    for (root, layer) in &q_roots {
        let opacity = layers.get(layer.0).opacity;
        let manager = groups.groups.entry(root).or_default();
        if opacity >= 1.0 && manager.tracked() == 0 { continue; }
        let ids = collect_group_materials(root, &q_children, &q_mats);
        manager.apply(ids, opacity, &mut assets);
    }
}

fn restore_unmounted_groups(
    mut removed: RemovedComponents<LayerRoot>,
    mut groups: ResMut<GroupOpacity>,
    mut assets: ResMut<Assets<StandardMaterial>>,
) {
    for root in removed.read() {
        if let Some(mut manager) = groups.groups.remove(&root) {
            manager.restore(&mut assets);
        }
    }
}

fn evict_removed_materials(mut ev_assets: EventReader<AssetEvent<StandardMaterial>>, mut groups: ResMut<GroupOpacity>) {
    for ev in ev_assets.read() {
        if let AssetEvent::Removed { id } = ev {
            for manager in groups.groups.values_mut() {
                manager.forget(*id);
            }
        }
    }
}
