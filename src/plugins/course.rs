// Course model: holes keyed by id plus the ordered sequence that drives list
// and render order. The two always hold the same id set.
use bevy::prelude::*;
use std::collections::HashMap;
use uuid::Uuid;

use crate::plugins::config::ForgeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HoleId(pub Uuid);

impl HoleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HoleId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoleKind {
    Straight,
    LShape,
    Dogleg,
    Ramp,
    Loop,
    Windmill,
    Tunnel,
}

impl HoleKind {
    pub const ALL: [HoleKind; 7] = [
        HoleKind::Straight,
        HoleKind::LShape,
        HoleKind::Dogleg,
        HoleKind::Ramp,
        HoleKind::Loop,
        HoleKind::Windmill,
        HoleKind::Tunnel,
    ];

    pub fn label(self) -> &'static str {
        match self {
            HoleKind::Straight => "Straight",
            HoleKind::LShape => "L-Shape",
            HoleKind::Dogleg => "Dogleg",
            HoleKind::Ramp => "Ramp",
            HoleKind::Loop => "Loop",
            HoleKind::Windmill => "Windmill",
            HoleKind::Tunnel => "Tunnel",
        }
    }

    /// Footprint (width, length) in metres.
    pub fn default_size(self) -> Vec2 {
        match self {
            HoleKind::Straight => Vec2::new(0.8, 3.0),
            HoleKind::LShape => Vec2::new(1.5, 2.5),
            HoleKind::Dogleg => Vec2::new(1.2, 3.0),
            HoleKind::Ramp => Vec2::new(0.8, 3.5),
            HoleKind::Loop => Vec2::new(0.8, 3.0),
            HoleKind::Windmill => Vec2::new(1.0, 3.0),
            HoleKind::Tunnel => Vec2::new(0.8, 4.0),
        }
    }

    pub fn default_color(self) -> Color {
        match self {
            HoleKind::Straight => Color::srgb(0.18, 0.55, 0.27),
            HoleKind::LShape => Color::srgb(0.16, 0.50, 0.45),
            HoleKind::Dogleg => Color::srgb(0.42, 0.55, 0.18),
            HoleKind::Ramp => Color::srgb(0.20, 0.40, 0.65),
            HoleKind::Loop => Color::srgb(0.55, 0.25, 0.60),
            HoleKind::Windmill => Color::srgb(0.70, 0.45, 0.15),
            HoleKind::Tunnel => Color::srgb(0.60, 0.22, 0.25),
        }
    }

    pub fn default_par(self) -> u8 {
        match self {
            HoleKind::Straight => 2,
            HoleKind::LShape | HoleKind::Dogleg | HoleKind::Ramp => 3,
            HoleKind::Loop | HoleKind::Windmill | HoleKind::Tunnel => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoleTemplate {
    pub id: TemplateId,
    pub name: String,
    pub base: HoleKind,
    pub size: Vec2,
    pub felt_color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hole {
    pub id: HoleId,
    pub kind: HoleKind,
    /// Floor position (x, z) of the hole centre.
    pub position: Vec2,
    pub rotation_deg: f32,
    pub name: String,
    pub par: u8,
    pub template_id: Option<TemplateId>,
}

impl Hole {
    pub fn transform(&self) -> Transform {
        Transform::from_xyz(self.position.x, 0.0, self.position.y)
            .with_rotation(Quat::from_rotation_y(self.rotation_deg.to_radians()))
    }
}

#[derive(Resource, Debug, Default, Clone)]
pub struct Course {
    holes: HashMap<HoleId, Hole>,
    hole_order: Vec<HoleId>,
    templates: HashMap<TemplateId, HoleTemplate>,
}

impl Course {
    pub fn add_hole(&mut self, kind: HoleKind, position: Vec2) -> HoleId {
        let id = HoleId::new();
        let hole = Hole {
            id,
            kind,
            position,
            rotation_deg: 0.0,
            name: format!("Hole {}", self.hole_order.len() + 1),
            par: kind.default_par(),
            template_id: None,
        };
        self.holes.insert(id, hole);
        self.hole_order.push(id);
        id
    }

    pub fn remove_hole(&mut self, id: HoleId) -> Option<Hole> {
        let hole = self.holes.remove(&id)?;
        self.hole_order.retain(|h| *h != id);
        Some(hole)
    }

    pub fn get(&self, id: HoleId) -> Option<&Hole> {
        self.holes.get(&id)
    }

    pub fn get_mut(&mut self, id: HoleId) -> Option<&mut Hole> {
        self.holes.get_mut(&id)
    }

    pub fn move_hole(&mut self, id: HoleId, position: Vec2) -> bool {
        self.holes.get_mut(&id).map(|h| h.position = position).is_some()
    }

    /// Rotation is kept in `[0, 360)`.
    pub fn rotate_hole(&mut self, id: HoleId, rotation_deg: f32) -> bool {
        self.holes.get_mut(&id).map(|h| h.rotation_deg = rotation_deg.rem_euclid(360.0)).is_some()
    }

    pub fn set_kind(&mut self, id: HoleId, kind: HoleKind) -> bool {
        self.holes.get_mut(&id).map(|h| h.kind = kind).is_some()
    }

    /// Moves the hole at `from` to `to` in the play order.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.hole_order.len() || to >= self.hole_order.len() {
            return false;
        }
        let id = self.hole_order.remove(from);
        self.hole_order.insert(to, id);
        true
    }

    pub fn ordered(&self) -> impl Iterator<Item = &Hole> {
        self.hole_order.iter().filter_map(|id| self.holes.get(id))
    }

    pub fn len(&self) -> usize {
        self.hole_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hole_order.is_empty()
    }

    /// Every ordered id exists in the map, exactly once, and vice versa.
    pub fn is_consistent(&self) -> bool {
        self.hole_order.len() == self.holes.len()
            && self.hole_order.iter().all(|id| self.holes.contains_key(id))
            && {
                let mut ids = self.hole_order.clone();
                ids.sort();
                ids.windows(2).all(|w| w[0] != w[1])
            }
    }

    pub fn add_template(&mut self, name: impl Into<String>, base: HoleKind, size: Vec2, felt_color: Color) -> TemplateId {
        let id = TemplateId(Uuid::new_v4());
        self.templates.insert(id, HoleTemplate { id, name: name.into(), base, size, felt_color });
        id
    }

    pub fn apply_template(&mut self, hole: HoleId, template: Option<TemplateId>) -> bool {
        if let Some(t) = template {
            if !self.templates.contains_key(&t) {
                return false;
            }
        }
        self.holes.get_mut(&hole).map(|h| h.template_id = template).is_some()
    }

    /// Footprint and felt colour, honouring the hole's template when it has one.
    pub fn resolved_appearance(&self, hole: &Hole) -> (Vec2, Color) {
        match hole.template_id.and_then(|t| self.templates.get(&t)) {
            Some(t) => (t.size, t.felt_color),
            None => (hole.kind.default_size(), hole.kind.default_color()),
        }
    }
}

/// Marker linking a spawned hole entity to its model entry.
#[derive(Component, Debug, Clone, Copy)]
pub struct HoleEntity {
    pub id: HoleId,
    pub kind: HoleKind,
}

pub struct CoursePlugin;
impl Plugin for CoursePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Course>().add_systems(PreStartup, seed_demo_course);
    }
}

fn seed_demo_course(mut course: ResMut<Course>, config: Option<Res<ForgeConfig>>) {
    let Some(config) = config else { return; };
    if !config.seed_demo_course || !course.is_empty() { return; }
    let w = config.hall.width;
    let l = config.hall.length;
    let layout = [
        (HoleKind::Straight, Vec2::new(w * 0.2, l * 0.15), 0.0),
        (HoleKind::Ramp, Vec2::new(w * 0.5, l * 0.15), 0.0),
        (HoleKind::Windmill, Vec2::new(w * 0.8, l * 0.2), 0.0),
        (HoleKind::Tunnel, Vec2::new(w * 0.2, l * 0.55), 0.0),
        (HoleKind::Loop, Vec2::new(w * 0.5, l * 0.55), 0.0),
        (HoleKind::LShape, Vec2::new(w * 0.8, l * 0.6), 90.0),
        (HoleKind::Dogleg, Vec2::new(w * 0.5, l * 0.85), 90.0),
    ];
    for (kind, pos, rot) in layout {
        let id = course.add_hole(kind, pos);
        course.rotate_hole(id, rot);
    }
    info!("COURSE seeded holes={}", course.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_keeps_map_and_order_in_sync() {
        let mut c = Course::default();
        let a = c.add_hole(HoleKind::Straight, Vec2::ZERO);
        let b = c.add_hole(HoleKind::Loop, Vec2::ONE);
        let d = c.add_hole(HoleKind::Tunnel, Vec2::ONE);
        assert!(c.is_consistent());
        assert!(c.remove_hole(b).is_some());
        assert!(c.remove_hole(b).is_none());
        assert!(c.is_consistent());
        let ids: Vec<HoleId> = c.ordered().map(|h| h.id).collect();
        assert_eq!(ids, vec![a, d]);
    }

    #[test]
    fn reorder_moves_holes() {
        let mut c = Course::default();
        let a = c.add_hole(HoleKind::Straight, Vec2::ZERO);
        let b = c.add_hole(HoleKind::Ramp, Vec2::ZERO);
        let d = c.add_hole(HoleKind::Loop, Vec2::ZERO);
        assert!(c.reorder(2, 0));
        let ids: Vec<HoleId> = c.ordered().map(|h| h.id).collect();
        assert_eq!(ids, vec![d, a, b]);
        assert!(!c.reorder(3, 0));
        assert!(c.is_consistent());
    }

    #[test]
    fn rotation_wraps() {
        let mut c = Course::default();
        let a = c.add_hole(HoleKind::Straight, Vec2::ZERO);
        c.rotate_hole(a, -90.0);
        assert_eq!(c.get(a).unwrap().rotation_deg, 270.0);
        c.rotate_hole(a, 720.0);
        assert_eq!(c.get(a).unwrap().rotation_deg, 0.0);
    }

    #[test]
    fn templates_override_appearance() {
        let mut c = Course::default();
        let a = c.add_hole(HoleKind::Straight, Vec2::ZERO);
        let hole = c.get(a).unwrap().clone();
        assert_eq!(c.resolved_appearance(&hole).0, HoleKind::Straight.default_size());

        let t = c.add_template("Wide", HoleKind::Straight, Vec2::new(1.4, 2.0), Color::srgb(0.9, 0.1, 0.1));
        assert!(c.apply_template(a, Some(t)));
        let hole = c.get(a).unwrap().clone();
        assert_eq!(c.resolved_appearance(&hole).0, Vec2::new(1.4, 2.0));

        let bogus = TemplateId(Uuid::new_v4());
        assert!(!c.apply_template(a, Some(bogus)));
    }
}
