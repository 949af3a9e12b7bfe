// Procedural geometry for hall walls and obstacles.
//
// Every builder is a pure function of its parameters returning `MeshData`;
// degenerate parameters give an empty mesh instead of panicking. Meshes use
// the hole's local frame: x across the lane, y up, z along the lane.
use bevy::math::cubic_splines::{CubicBezier, CubicCardinalSpline, CubicGenerator};
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// CPU-side triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex(&mut self, p: Vec3, n: Vec3, uv: Vec2) -> u32 {
        let i = self.positions.len() as u32;
        self.positions.push(p.to_array());
        self.normals.push(n.normalize_or_zero().to_array());
        self.uvs.push(uv.to_array());
        i
    }

    pub fn tri(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Quad with corners in counter-clockwise order seen from the front.
    pub fn quad(&mut self, a: u32, b: u32, c: u32, d: u32) {
        self.indices.extend_from_slice(&[a, b, c, a, c, d]);
    }

    /// Flat quad from four points; the normal follows the winding.
    pub fn flat_quad(&mut self, p: [Vec3; 4]) {
        let n = (p[1] - p[0]).cross(p[2] - p[0]);
        let a = self.vertex(p[0], n, Vec2::new(0.0, 0.0));
        let b = self.vertex(p[1], n, Vec2::new(1.0, 0.0));
        let c = self.vertex(p[2], n, Vec2::new(1.0, 1.0));
        let d = self.vertex(p[3], n, Vec2::new(0.0, 1.0));
        self.quad(a, b, c, d);
    }

    pub fn append(&mut self, other: MeshData) {
        let base = self.positions.len() as u32;
        self.positions.extend(other.positions);
        self.normals.extend(other.normals);
        self.uvs.extend(other.uvs);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
    }

    pub fn translated(mut self, offset: Vec3) -> Self {
        for p in &mut self.positions {
            p[0] += offset.x;
            p[1] += offset.y;
            p[2] += offset.z;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn into_mesh(self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs);
        mesh.insert_indices(Indices::U32(self.indices));
        mesh
    }
}

fn positive(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite() && *v > 0.0)
}

/// Axis aligned box centred at `center`.
pub fn cuboid(center: Vec3, size: Vec3) -> MeshData {
    let mut m = MeshData::default();
    if !positive(&[size.x, size.y, size.z]) {
        return m;
    }
    let h = size * 0.5;
    let c = |x: f32, y: f32, z: f32| center + Vec3::new(x * h.x, y * h.y, z * h.z);
    // +X, -X, +Y, -Y, +Z, -Z
    m.flat_quad([c(1.0, -1.0, 1.0), c(1.0, -1.0, -1.0), c(1.0, 1.0, -1.0), c(1.0, 1.0, 1.0)]);
    m.flat_quad([c(-1.0, -1.0, -1.0), c(-1.0, -1.0, 1.0), c(-1.0, 1.0, 1.0), c(-1.0, 1.0, -1.0)]);
    m.flat_quad([c(-1.0, 1.0, 1.0), c(1.0, 1.0, 1.0), c(1.0, 1.0, -1.0), c(-1.0, 1.0, -1.0)]);
    m.flat_quad([c(-1.0, -1.0, -1.0), c(1.0, -1.0, -1.0), c(1.0, -1.0, 1.0), c(-1.0, -1.0, 1.0)]);
    m.flat_quad([c(-1.0, -1.0, 1.0), c(1.0, -1.0, 1.0), c(1.0, 1.0, 1.0), c(-1.0, 1.0, 1.0)]);
    m.flat_quad([c(1.0, -1.0, -1.0), c(-1.0, -1.0, -1.0), c(-1.0, 1.0, -1.0), c(1.0, 1.0, -1.0)]);
    m
}

/// Four walls enclosing the `[0, width] x [0, length]` hall footprint, placed
/// outside it so the interior keeps its full size.
pub fn hall_walls(width: f32, length: f32, height: f32, thickness: f32) -> MeshData {
    let mut m = MeshData::default();
    if !positive(&[width, length, height, thickness]) {
        return m;
    }
    let y = height * 0.5;
    let span_x = width + 2.0 * thickness;
    m.append(cuboid(Vec3::new(-thickness * 0.5, y, length * 0.5), Vec3::new(thickness, height, length)));
    m.append(cuboid(Vec3::new(width + thickness * 0.5, y, length * 0.5), Vec3::new(thickness, height, length)));
    m.append(cuboid(Vec3::new(width * 0.5, y, -thickness * 0.5), Vec3::new(span_x, height, thickness)));
    m.append(cuboid(Vec3::new(width * 0.5, y, length + thickness * 0.5), Vec3::new(span_x, height, thickness)));
    m
}

/// Semicircular annulus extruded along z, centred on the origin at floor level.
pub fn tunnel_arch(outer_radius: f32, thickness: f32, length: f32, segments: u32) -> MeshData {
    let mut m = MeshData::default();
    let inner_radius = outer_radius - thickness;
    if !positive(&[outer_radius, thickness, length, inner_radius]) || segments == 0 {
        return m;
    }
    let z0 = -length * 0.5;
    let z1 = length * 0.5;
    let ring = |r: f32, a: f32| Vec3::new(r * a.cos(), r * a.sin(), 0.0);

    // Outer and inner shells.
    for (r, sign) in [(outer_radius, 1.0_f32), (inner_radius, -1.0)] {
        let start = m.vertex_count() as u32;
        for i in 0..=segments {
            let a = PI * i as f32 / segments as f32;
            let p = ring(r, a);
            let n = Vec3::new(a.cos(), a.sin(), 0.0) * sign;
            let u = i as f32 / segments as f32;
            m.vertex(p + Vec3::Z * z0, n, Vec2::new(u, 0.0));
            m.vertex(p + Vec3::Z * z1, n, Vec2::new(u, 1.0));
        }
        for i in 0..segments {
            let a0 = start + i * 2;
            let (b0, a1, b1) = (a0 + 1, a0 + 2, a0 + 3);
            if sign > 0.0 {
                m.quad(a0, a1, b1, b0);
            } else {
                m.quad(a0, b0, b1, a1);
            }
        }
    }

    // Annulus caps at both ends.
    for (z, nz) in [(z1, 1.0_f32), (z0, -1.0)] {
        let start = m.vertex_count() as u32;
        for i in 0..=segments {
            let a = PI * i as f32 / segments as f32;
            let u = i as f32 / segments as f32;
            m.vertex(ring(outer_radius, a) + Vec3::Z * z, Vec3::Z * nz, Vec2::new(u, 1.0));
            m.vertex(ring(inner_radius, a) + Vec3::Z * z, Vec3::Z * nz, Vec2::new(u, 0.0));
        }
        for i in 0..segments {
            let o0 = start + i * 2;
            let (i0, o1, i1) = (o0 + 1, o0 + 2, o0 + 3);
            if nz > 0.0 {
                m.quad(o0, o1, i1, i0);
            } else {
                m.quad(o0, i0, i1, o1);
            }
        }
    }

    // Feet where the arch meets the floor.
    for x_sign in [1.0_f32, -1.0] {
        let xo = outer_radius * x_sign;
        let xi = inner_radius * x_sign;
        let pts = [Vec3::new(xi, 0.0, z0), Vec3::new(xo, 0.0, z0), Vec3::new(xo, 0.0, z1), Vec3::new(xi, 0.0, z1)];
        if x_sign > 0.0 {
            m.flat_quad(pts);
        } else {
            m.flat_quad([pts[1], pts[0], pts[3], pts[2]]);
        }
    }
    m
}

/// Ramp profile point pairs `(z, y)` along a cubic Bézier whose tangent is
/// horizontal at the entry (z = 0) and at the crest (z = length).
pub fn ramp_profile(length: f32, height: f32, segments: u32) -> Vec<Vec2> {
    if !positive(&[length, height]) || segments == 0 {
        return Vec::new();
    }
    let curve = CubicBezier::new([[
        Vec2::new(0.0, 0.0),
        Vec2::new(length * 0.5, 0.0),
        Vec2::new(length * 0.5, height),
        Vec2::new(length, height),
    ]])
    .to_curve();
    (0..=segments).map(|i| curve.position(i as f32 / segments as f32)).collect()
}

/// Ramp body: curved top surface, two side walls, back face and base.
pub fn ramp(width: f32, length: f32, height: f32, segments: u32) -> MeshData {
    let mut m = MeshData::default();
    if !positive(&[width]) {
        return m;
    }
    let profile = ramp_profile(length, height, segments);
    if profile.len() < 2 {
        return m;
    }
    let hw = width * 0.5;
    let z_off = -length * 0.5;
    let at = |p: Vec2, x: f32| Vec3::new(x, p.y, p.x + z_off);

    // Top surface.
    let start = m.vertex_count() as u32;
    for (i, p) in profile.iter().enumerate() {
        let prev = profile[i.saturating_sub(1)];
        let next = profile[(i + 1).min(profile.len() - 1)];
        let t = (next - prev).normalize_or_zero();
        let n = Vec3::new(0.0, t.x, -t.y);
        let v = i as f32 / (profile.len() - 1) as f32;
        m.vertex(at(*p, -hw), n, Vec2::new(0.0, v));
        m.vertex(at(*p, hw), n, Vec2::new(1.0, v));
    }
    for i in 0..(profile.len() as u32 - 1) {
        let l0 = start + i * 2;
        let (r0, l1, r1) = (l0 + 1, l0 + 2, l0 + 3);
        m.quad(l0, l1, r1, r0);
    }

    // Side walls as strips between the floor and the profile.
    for x in [-hw, hw] {
        for w in profile.windows(2) {
            let (a, b) = (w[0], w[1]);
            let quad = [at(Vec2::new(a.x, 0.0), x), at(Vec2::new(b.x, 0.0), x), at(b, x), at(a, x)];
            if x < 0.0 {
                m.flat_quad(quad);
            } else {
                m.flat_quad([quad[1], quad[0], quad[3], quad[2]]);
            }
        }
    }

    // Back face at the crest and the base.
    let z_end = length + z_off;
    m.flat_quad([
        Vec3::new(-hw, 0.0, z_end),
        Vec3::new(hw, 0.0, z_end),
        Vec3::new(hw, height, z_end),
        Vec3::new(-hw, height, z_end),
    ]);
    m.flat_quad([
        Vec3::new(-hw, 0.0, z_off),
        Vec3::new(hw, 0.0, z_off),
        Vec3::new(hw, 0.0, z_end),
        Vec3::new(-hw, 0.0, z_end),
    ]);
    m
}

/// Open-sided frustum along +y with a top cap; `top_radius == 0` gives a cone.
pub fn frustum(bottom_radius: f32, top_radius: f32, height: f32, segments: u32, cap_top: bool) -> MeshData {
    let mut m = MeshData::default();
    if !positive(&[bottom_radius, height]) || !(top_radius >= 0.0) || segments < 3 {
        return m;
    }
    let slope = (bottom_radius - top_radius) / height;
    let start = m.vertex_count() as u32;
    for i in 0..=segments {
        let a = TAU * i as f32 / segments as f32;
        let (s, c) = a.sin_cos();
        let n = Vec3::new(c, slope, s);
        let u = i as f32 / segments as f32;
        m.vertex(Vec3::new(c * bottom_radius, 0.0, s * bottom_radius), n, Vec2::new(u, 0.0));
        m.vertex(Vec3::new(c * top_radius, height, s * top_radius), n, Vec2::new(u, 1.0));
    }
    for i in 0..segments {
        let b0 = start + i * 2;
        let (t0, b1, t1) = (b0 + 1, b0 + 2, b0 + 3);
        m.quad(b0, t0, t1, b1);
    }
    if cap_top && top_radius > 0.0 {
        let center = m.vertex(Vec3::new(0.0, height, 0.0), Vec3::Y, Vec2::splat(0.5));
        let rim = m.vertex_count() as u32;
        for i in 0..=segments {
            let a = TAU * i as f32 / segments as f32;
            let (s, c) = a.sin_cos();
            m.vertex(Vec3::new(c * top_radius, height, s * top_radius), Vec3::Y, Vec2::new(0.5 + c * 0.5, 0.5 + s * 0.5));
        }
        for i in 0..segments {
            m.tri(center, rim + i + 1, rim + i);
        }
    }
    m
}

pub fn windmill_tower(bottom_radius: f32, top_radius: f32, height: f32, segments: u32) -> MeshData {
    if top_radius >= bottom_radius {
        return MeshData::default();
    }
    frustum(bottom_radius, top_radius, height, segments, true)
}

pub fn windmill_roof(radius: f32, height: f32, segments: u32) -> MeshData {
    frustum(radius, 0.0, height, segments, false)
}

/// Trapezoidal blade in the xy plane pointing along +y, extruded along z.
pub fn windmill_blade(root_width: f32, tip_width: f32, length: f32, thickness: f32) -> MeshData {
    let mut m = MeshData::default();
    if !positive(&[root_width, tip_width, length, thickness]) {
        return m;
    }
    let (rw, tw, hz) = (root_width * 0.5, tip_width * 0.5, thickness * 0.5);
    let front = [Vec3::new(-rw, 0.0, hz), Vec3::new(rw, 0.0, hz), Vec3::new(tw, length, hz), Vec3::new(-tw, length, hz)];
    let back = front.map(|p| Vec3::new(p.x, p.y, -hz));
    m.flat_quad(front);
    m.flat_quad([back[1], back[0], back[3], back[2]]);
    for i in 0..4 {
        let j = (i + 1) % 4;
        m.flat_quad([front[j], front[i], back[i], back[j]]);
    }
    m
}

/// Centre line of the loop: a half circle in the yz plane rising from the
/// floor at z = 0 to the apex at y = 2 * radius.
pub fn loop_path(radius: f32, samples: u32) -> Vec<Vec3> {
    if !positive(&[radius]) || samples < 2 {
        return Vec::new();
    }
    const CONTROL: usize = 9;
    let step = PI / (CONTROL - 1) as f32;
    // to_curve mirrors the end points itself, so only points on the circle go in.
    let control: Vec<Vec3> = (0..CONTROL)
        .map(|k| {
            let a = -FRAC_PI_2 + k as f32 * step;
            Vec3::new(0.0, radius + radius * a.sin(), radius * a.cos())
        })
        .collect();
    let curve = CubicCardinalSpline::new_catmull_rom(control).to_curve();
    let span = (CONTROL - 1) as f32;
    (0..=samples).map(|i| curve.position(span * i as f32 / samples as f32)).collect()
}

/// Open tube swept along `loop_path`.
pub fn loop_tube(radius: f32, tube_radius: f32, tubular_segments: u32, radial_segments: u32) -> MeshData {
    let mut m = MeshData::default();
    if !positive(&[tube_radius]) || radial_segments < 3 {
        return m;
    }
    let path = loop_path(radius, tubular_segments);
    if path.len() < 2 {
        return m;
    }
    for (i, p) in path.iter().enumerate() {
        let prev = path[i.saturating_sub(1)];
        let next = path[(i + 1).min(path.len() - 1)];
        let tangent = (next - prev).normalize_or_zero();
        // The path stays in the yz plane, so x is a stable binormal.
        let binormal = Vec3::X;
        let normal = binormal.cross(tangent).normalize_or_zero();
        let v = i as f32 / (path.len() - 1) as f32;
        for j in 0..=radial_segments {
            let a = TAU * j as f32 / radial_segments as f32;
            let dir = normal * a.cos() + binormal * a.sin();
            m.vertex(*p + dir * tube_radius, dir, Vec2::new(j as f32 / radial_segments as f32, v));
        }
    }
    let ring = radial_segments + 1;
    for i in 0..(path.len() as u32 - 1) {
        for j in 0..radial_segments {
            let a = i * ring + j;
            let b = a + ring;
            m.quad(a, a + 1, b + 1, b);
        }
    }
    m
}

pub fn loop_pillar(bottom_radius: f32, top_radius: f32, height: f32) -> MeshData {
    frustum(bottom_radius, top_radius, height, 12, true)
}

/// Horizontal cross brace spanning the loop diameter along x.
pub fn loop_brace(diameter: f32) -> MeshData {
    if !positive(&[diameter]) {
        return MeshData::default();
    }
    let bar = (diameter * 0.06).max(0.02);
    cuboid(Vec3::ZERO, Vec3::new(diameter, bar, bar))
}
