use std::collections::BTreeMap;
use std::f64::consts::{PI, TAU};

use serde::Serialize;

use super::diagnostics::GeomMeshDiagnostics;
use super::{BBox, Point3, Transform, Vec3};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GeomMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<[f64; 2]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<[f64; 3]>>,
}

impl GeomMesh {
    /// Create a new mesh with positions and indices only.
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            uvs: None,
            normals: None,
        }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if any vertex position contains NaN or Inf values.
    #[must_use]
    pub fn has_invalid_vertices(&self) -> bool {
        self.positions
            .iter()
            .any(|p| !p[0].is_finite() || !p[1].is_finite() || !p[2].is_finite())
    }

    #[must_use]
    pub fn has_valid_indices(&self) -> bool {
        let n = self.positions.len() as u32;
        self.indices.iter().all(|&i| i < n)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err("mesh indices are not a triangle list (len % 3 != 0)".to_string());
        }
        if self.has_invalid_vertices() {
            return Err("mesh has invalid vertex coordinates (NaN/Inf)".to_string());
        }
        if !self.has_valid_indices() {
            return Err("mesh has out-of-bounds vertex indices".to_string());
        }
        let n = self.positions.len();
        let attributes_match = self.uvs.as_ref().is_none_or(|uvs| uvs.len() == n)
            && self.normals.as_ref().is_none_or(|normals| normals.len() == n);
        if !attributes_match {
            return Err("mesh attribute buffers do not match vertex count".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub fn points(&self) -> Vec<Point3> {
        self.positions.iter().copied().map(Point3::from_array).collect()
    }

    #[must_use]
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.points())
    }

    /// Radius of the smallest sphere around `center` containing every vertex.
    #[must_use]
    pub fn radius_about(&self, center: Point3) -> f64 {
        self.positions
            .iter()
            .map(|p| Point3::from_array(*p).distance_to(center))
            .fold(0.0, f64::max)
    }

    /// Copy with positions and normals mapped through `t`.
    #[must_use]
    pub fn transformed(&self, t: Transform) -> Self {
        let positions = self
            .positions
            .iter()
            .map(|p| t.apply_point(Point3::from_array(*p)).to_array())
            .collect();
        let normals = self.normals.as_ref().map(|normals| {
            normals
                .iter()
                .map(|n| {
                    t.apply_vec(Vec3::from(*n))
                        .normalized()
                        .unwrap_or(Vec3::Z)
                        .to_array()
                })
                .collect()
        });
        Self {
            positions,
            indices: self.indices.clone(),
            uvs: self.uvs.clone(),
            normals,
        }
    }

    /// Replaces the normal buffer with area-weighted vertex normals.
    pub fn recompute_normals(&mut self) -> usize {
        let (normals, degenerate) = compute_smooth_normals(&self.points(), &self.indices);
        self.normals = Some(normals);
        degenerate
    }
}

/// Polyline drawn as a connected line strip.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LineStrip {
    pub points: Vec<[f64; 3]>,
}

impl LineStrip {
    #[must_use]
    pub fn from_points(points: &[Point3]) -> Self {
        Self {
            points: points.iter().map(|p| p.to_array()).collect(),
        }
    }
}

/// Wireframe outline as index pairs into the position buffer of the mesh it was
/// extracted from. It owns no vertices of its own.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EdgeOverlay {
    pub segments: Vec<[u32; 2]>,
}

impl EdgeOverlay {
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when every segment indexes into a buffer of `vertex_count` vertices.
    #[must_use]
    pub fn fits(&self, vertex_count: usize) -> bool {
        let n = vertex_count as u32;
        self.segments.iter().all(|[a, b]| *a < n && *b < n)
    }
}

#[derive(Debug, Clone, Copy)]
struct EdgeFaces {
    first_normal: Option<Vec3>,
    crease: bool,
    count: usize,
}

/// Boundary edges plus edges whose adjacent faces bend by more than `threshold_deg`.
#[must_use]
pub fn feature_edges(mesh: &GeomMesh, threshold_deg: f64) -> EdgeOverlay {
    let cos_threshold = threshold_deg.to_radians().cos();
    let points = mesh.points();
    let mut edges: BTreeMap<(u32, u32), EdgeFaces> = BTreeMap::new();

    for tri in mesh.indices.chunks_exact(3) {
        let normal = face_normal(&points, tri);
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let key = (a.min(b), a.max(b));
            let entry = edges.entry(key).or_insert(EdgeFaces {
                first_normal: normal,
                crease: false,
                count: 0,
            });
            if entry.count == 1 {
                if let (Some(n0), Some(n1)) = (entry.first_normal, normal) {
                    entry.crease = n0.dot(n1) < cos_threshold;
                }
            }
            entry.count += 1;
        }
    }

    let segments = edges
        .into_iter()
        .filter(|(_, faces)| faces.count != 2 || faces.crease)
        .map(|((a, b), _)| [a, b])
        .collect();

    EdgeOverlay { segments }
}

fn face_normal(points: &[Point3], tri: &[u32]) -> Option<Vec3> {
    let a = points.get(tri[0] as usize)?;
    let b = points.get(tri[1] as usize)?;
    let c = points.get(tri[2] as usize)?;
    b.sub_point(*a).cross(c.sub_point(*a)).normalized()
}

pub(crate) fn finalize_mesh(
    points: Vec<Point3>,
    uvs: Option<Vec<[f64; 2]>>,
    indices: Vec<u32>,
) -> (GeomMesh, GeomMeshDiagnostics) {
    let (normals, degenerate_triangle_count) = compute_smooth_normals(&points, &indices);
    let (open_edge_count, non_manifold_edge_count) = count_edge_topology(&indices);

    let mut warnings = Vec::new();
    if non_manifold_edge_count > 0 {
        warnings.push("mesh has non-manifold edges".to_string());
    }

    let mesh = GeomMesh {
        positions: points.into_iter().map(Point3::to_array).collect(),
        indices,
        uvs,
        normals: Some(normals),
    };

    let diagnostics = GeomMeshDiagnostics {
        vertex_count: mesh.vertex_count(),
        triangle_count: mesh.triangle_count(),
        degenerate_triangle_count,
        open_edge_count,
        non_manifold_edge_count,
        skipped_reprojection_count: 0,
        warnings,
    };

    (mesh, diagnostics)
}

/// Area-weighted vertex normals; also returns the number of zero-area triangles.
pub(crate) fn compute_smooth_normals(points: &[Point3], indices: &[u32]) -> (Vec<[f64; 3]>, usize) {
    let mut sums = vec![Vec3::ZERO; points.len()];
    let mut degenerate = 0usize;

    for tri in indices.chunks_exact(3) {
        let (Some(a), Some(b), Some(c)) = (
            points.get(tri[0] as usize),
            points.get(tri[1] as usize),
            points.get(tri[2] as usize),
        ) else {
            continue;
        };

        let n = b.sub_point(*a).cross(c.sub_point(*a));
        if n.length_squared() <= f64::EPSILON * f64::EPSILON {
            degenerate += 1;
            continue;
        }
        for &i in tri {
            sums[i as usize] = sums[i as usize].add(n);
        }
    }

    let normals = sums
        .into_iter()
        .map(|n| n.normalized().unwrap_or(Vec3::Z).to_array())
        .collect();
    (normals, degenerate)
}

fn count_edge_topology(indices: &[u32]) -> (usize, usize) {
    let mut counts: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    for tri in indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }
    let open = counts.values().filter(|&&c| c == 1).count();
    let non_manifold = counts.values().filter(|&&c| c > 2).count();
    (open, non_manifold)
}

// ─── Primitives ──────────────────────────────────────────────────────────────

/// Latitude/longitude sphere centered at the origin, seam and pole vertices duplicated.
#[must_use]
pub fn uv_sphere(radius: f64, width_segments: usize, height_segments: usize) -> GeomMesh {
    let width = width_segments.max(3);
    let height = height_segments.max(2);
    let mut positions = Vec::with_capacity((width + 1) * (height + 1));
    let mut normals = Vec::with_capacity(positions.capacity());
    let mut uvs = Vec::with_capacity(positions.capacity());

    for iy in 0..=height {
        let v = iy as f64 / height as f64;
        let theta = v * PI;
        for ix in 0..=width {
            let u = ix as f64 / width as f64;
            let phi = u * TAU;
            let n = Vec3::new(-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
            positions.push(n.mul_scalar(radius).to_array());
            normals.push(n.to_array());
            uvs.push([u, 1.0 - v]);
        }
    }

    let row = width + 1;
    let mut indices = Vec::with_capacity(width * height * 6);
    for iy in 0..height {
        for ix in 0..width {
            let a = (iy * row + ix + 1) as u32;
            let b = (iy * row + ix) as u32;
            let c = ((iy + 1) * row + ix) as u32;
            let d = ((iy + 1) * row + ix + 1) as u32;
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    GeomMesh {
        positions,
        indices,
        uvs: Some(uvs),
        normals: Some(normals),
    }
}

/// Torus in the XY plane around the Z axis.
#[must_use]
pub fn torus(radius: f64, tube: f64, radial_segments: usize, tubular_segments: usize) -> GeomMesh {
    let radial = radial_segments.max(3);
    let tubular = tubular_segments.max(3);
    let mut positions = Vec::with_capacity((radial + 1) * (tubular + 1));
    let mut normals = Vec::with_capacity(positions.capacity());

    for j in 0..=radial {
        let v = j as f64 / radial as f64 * TAU;
        for i in 0..=tubular {
            let u = i as f64 / tubular as f64 * TAU;
            let p = Vec3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            positions.push(p.to_array());
            normals.push(p.sub(center).normalized().unwrap_or(Vec3::Z).to_array());
        }
    }

    let row = tubular + 1;
    let mut indices = Vec::with_capacity(radial * tubular * 6);
    for j in 1..=radial {
        for i in 1..=tubular {
            let a = (row * j + i - 1) as u32;
            let b = (row * (j - 1) + i - 1) as u32;
            let c = (row * (j - 1) + i) as u32;
            let d = (row * j + i) as u32;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    GeomMesh {
        positions,
        indices,
        uvs: None,
        normals: Some(normals),
    }
}

/// Flat annulus in the XY plane facing +Z.
#[must_use]
pub fn flat_ring(inner_radius: f64, outer_radius: f64, theta_segments: usize) -> GeomMesh {
    let segments = theta_segments.max(3);
    let mut positions = Vec::with_capacity(2 * (segments + 1));

    for radius in [inner_radius, outer_radius] {
        for i in 0..=segments {
            let angle = i as f64 / segments as f64 * TAU;
            positions.push([radius * angle.cos(), radius * angle.sin(), 0.0]);
        }
    }

    let row = (segments + 1) as u32;
    let mut indices = Vec::with_capacity(segments * 6);
    for i in 0..segments as u32 {
        let (a, b, c, d) = (i, i + row, i + row + 1, i + 1);
        indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    let normals = vec![[0.0, 0.0, 1.0]; positions.len()];
    GeomMesh {
        positions,
        indices,
        uvs: None,
        normals: Some(normals),
    }
}

/// Capped truncated cone along Y, centered at the origin.
#[must_use]
pub fn frustum(radius_top: f64, radius_bottom: f64, height: f64, radial_segments: usize) -> GeomMesh {
    let segments = radial_segments.max(3);
    let half = height * 0.5;
    let mut points = Vec::with_capacity(2 * (segments + 1) + 2 * (segments + 2));

    for (y, radius) in [(half, radius_top), (-half, radius_bottom)] {
        for x in 0..=segments {
            let theta = x as f64 / segments as f64 * TAU;
            points.push(Point3::new(radius * theta.sin(), y, radius * theta.cos()));
        }
    }

    let row = (segments + 1) as u32;
    let mut indices = Vec::with_capacity(segments * 12);
    for x in 0..segments as u32 {
        let (a, b, c, d) = (x, x + row, x + row + 1, x + 1);
        indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    for (y, radius, top) in [(half, radius_top, true), (-half, radius_bottom, false)] {
        let center = points.len() as u32;
        points.push(Point3::new(0.0, y, 0.0));
        for x in 0..segments {
            let theta = x as f64 / segments as f64 * TAU;
            points.push(Point3::new(radius * theta.sin(), y, radius * theta.cos()));
        }
        for x in 0..segments as u32 {
            let a = center + 1 + x;
            let b = center + 1 + (x + 1) % segments as u32;
            if top {
                indices.extend_from_slice(&[center, a, b]);
            } else {
                indices.extend_from_slice(&[center, b, a]);
            }
        }
    }

    finalize_mesh(points, None, indices).0
}
