//! Variable-radius tube sweep.
//!
//! The sweep runs in two passes:
//! - a canonical unit-radius tube is laid out on rotation-minimizing frames at
//!   `t = ring / tubular_segments`;
//! - a reprojection pass writes a new position buffer, moving each vertex from
//!   the center line along its own offset direction to the profile radius.
//!
//! Normals are recomputed from the displaced positions and the wireframe overlay
//! indexes the same position buffer as the surface.

use super::curve::{CurveError, Curve3, is_noise};
use super::diagnostics::GeomMeshDiagnostics;
use super::mesh::{EdgeOverlay, GeomMesh, feature_edges, finalize_mesh};
use super::{Point3, Tolerance, Vec3};

/// Angle in degrees above which a shared edge is drawn in the overlay.
const OVERLAY_CREASE_DEG: f64 = 1.0;

/// Sampling resolution of a tube sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TubeOptions {
    /// Rings along the curve, minus one.
    pub tubular_segments: usize,
    /// Vertices around each ring.
    pub radial_segments: usize,
}

impl TubeOptions {
    pub const MIN_TUBULAR_SEGMENTS: usize = 8;
    pub const MIN_RADIAL_SEGMENTS: usize = 6;

    #[must_use]
    pub const fn new(tubular_segments: usize, radial_segments: usize) -> Self {
        Self {
            tubular_segments,
            radial_segments,
        }
    }

    fn validate(self) -> Result<(), TubeError> {
        if self.tubular_segments < Self::MIN_TUBULAR_SEGMENTS {
            return Err(TubeError::TooFewTubularSegments(self.tubular_segments));
        }
        if self.radial_segments < Self::MIN_RADIAL_SEGMENTS {
            return Err(TubeError::TooFewRadialSegments(self.radial_segments));
        }
        Ok(())
    }
}

impl Default for TubeOptions {
    fn default() -> Self {
        Self::new(80, 16)
    }
}

/// Radius as a function of the curve parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RadiusProfile {
    /// `start + (end - start) * t`.
    Linear { start: f64, end: f64 },
    /// `end + (start - end) * (1 - t)^exponent`; thins quickly near the base for
    /// `exponent > 1` and stays monotone between the two radii.
    Taper { start: f64, end: f64, exponent: f64 },
}

impl RadiusProfile {
    #[must_use]
    pub const fn uniform(radius: f64) -> Self {
        Self::Linear {
            start: radius,
            end: radius,
        }
    }

    #[must_use]
    pub fn radius_at(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Self::Linear { start, end } => start + (end - start) * t,
            Self::Taper { start, end, exponent } => end + (start - end) * (1.0 - t).powf(exponent),
        }
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        match *self {
            Self::Linear { start, .. } | Self::Taper { start, .. } => start,
        }
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        match *self {
            Self::Linear { end, .. } | Self::Taper { end, .. } => end,
        }
    }

    fn validate(&self) -> Result<(), TubeError> {
        let radii_ok = |r: f64| r.is_finite() && r > 0.0;
        if !radii_ok(self.start()) || !radii_ok(self.end()) {
            return Err(TubeError::InvalidRadius {
                start: self.start(),
                end: self.end(),
            });
        }
        if let Self::Taper { exponent, .. } = *self {
            if !exponent.is_finite() || exponent <= 0.0 {
                return Err(TubeError::InvalidExponent(exponent));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TubeError {
    #[error("tube requires at least {} tubular segments, got {0}", TubeOptions::MIN_TUBULAR_SEGMENTS)]
    TooFewTubularSegments(usize),
    #[error("tube requires at least {} radial segments, got {0}", TubeOptions::MIN_RADIAL_SEGMENTS)]
    TooFewRadialSegments(usize),
    #[error("tube radii must be finite and > 0 (start={start}, end={end})")]
    InvalidRadius { start: f64, end: f64 },
    #[error("taper exponent must be finite and > 0, got {0}")]
    InvalidExponent(f64),
    #[error("curve has no usable direction; tube cannot be framed")]
    DegenerateCurve,
    #[error(transparent)]
    Curve(#[from] CurveError),
}

/// Surface, overlay and per-ring center line of a swept tube.
#[derive(Debug, Clone)]
pub struct TubeMesh {
    pub mesh: GeomMesh,
    pub edges: EdgeOverlay,
    /// `curve.point_at(ring / tubular_segments)` for every ring.
    pub centers: Vec<Point3>,
    pub radial_segments: usize,
    pub diagnostics: GeomMeshDiagnostics,
}

impl TubeMesh {
    #[must_use]
    pub fn ring_count(&self) -> usize {
        self.centers.len()
    }

    /// Mean distance of each ring's vertices from its center.
    #[must_use]
    pub fn ring_radii(&self) -> Vec<f64> {
        self.centers
            .iter()
            .enumerate()
            .map(|(ring, center)| {
                let start = ring * self.radial_segments;
                let ring_positions = &self.mesh.positions[start..start + self.radial_segments];
                let total: f64 = ring_positions
                    .iter()
                    .map(|p| Point3::from_array(*p).distance_to(*center))
                    .sum();
                total / self.radial_segments as f64
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RailFrame {
    pub tangent: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
}

impl RailFrame {
    fn from_tangent(tangent: Vec3) -> Option<Self> {
        let tangent = tangent.normalized()?;
        let binormal = tangent.any_perpendicular()?;
        let normal = binormal.cross(tangent).normalized()?;
        Some(Self {
            tangent,
            normal,
            binormal,
        })
    }
}

/// Unit-radius tube before the radius pass. Vertex `ring * radial + seg` belongs
/// to ring `ring`.
#[derive(Debug, Clone)]
struct CanonicalTube {
    positions: Vec<Point3>,
    uvs: Vec<[f64; 2]>,
    indices: Vec<u32>,
    centers: Vec<Point3>,
    tubular_segments: usize,
    radial_segments: usize,
}

/// Sweeps `profile` along `curve`.
pub fn sweep_tube(
    curve: &impl Curve3,
    profile: RadiusProfile,
    options: TubeOptions,
) -> Result<TubeMesh, TubeError> {
    options.validate()?;
    profile.validate()?;

    let canonical = canonical_tube(curve, options)?;
    let (positions, skipped) = reproject_radii(&canonical, &profile);

    let (mesh, mut diagnostics) = finalize_mesh(positions, Some(canonical.uvs), canonical.indices);
    diagnostics.skipped_reprojection_count = skipped;
    if skipped > 0 {
        diagnostics.add_warning(format!("{skipped} vertices on the center line kept in place"));
    }

    let edges = feature_edges(&mesh, OVERLAY_CREASE_DEG);

    Ok(TubeMesh {
        mesh,
        edges,
        centers: canonical.centers,
        radial_segments: options.radial_segments,
        diagnostics,
    })
}

fn canonical_tube(curve: &impl Curve3, options: TubeOptions) -> Result<CanonicalTube, TubeError> {
    let segments = options.tubular_segments;
    let radial = options.radial_segments;

    let centers: Vec<Point3> = (0..=segments)
        .map(|i| curve.point_at(i as f64 / segments as f64))
        .collect();
    let frames = compute_rail_frames(curve, &centers, Tolerance::default_geom())?;

    let mut positions = Vec::with_capacity(centers.len() * radial);
    let mut uvs = Vec::with_capacity(centers.len() * radial);
    for (ring, (center, frame)) in centers.iter().zip(&frames).enumerate() {
        let u = ring as f64 / segments as f64;
        for seg in 0..radial {
            let v = seg as f64 / radial as f64;
            let angle = std::f64::consts::TAU * v;
            let offset = frame
                .normal
                .mul_scalar(angle.cos())
                .add(frame.binormal.mul_scalar(angle.sin()));
            positions.push(center.add_vec(offset));
            uvs.push([u, v]);
        }
    }

    let mut indices = Vec::with_capacity(segments * radial * 6);
    for ring in 0..segments {
        for seg in 0..radial {
            let seg_next = (seg + 1) % radial;
            let i0 = (ring * radial + seg) as u32;
            let i1 = (ring * radial + seg_next) as u32;
            let i2 = ((ring + 1) * radial + seg_next) as u32;
            let i3 = ((ring + 1) * radial + seg) as u32;
            indices.extend_from_slice(&[i0, i1, i2, i0, i2, i3]);
        }
    }

    Ok(CanonicalTube {
        positions,
        uvs,
        indices,
        centers,
        tubular_segments: segments,
        radial_segments: radial,
    })
}

/// Writes a new position buffer with each ring at its profile radius.
///
/// Offsets shorter than `Tolerance::ZERO_LENGTH` have no direction; those
/// vertices are copied unchanged and counted.
fn reproject_radii(canonical: &CanonicalTube, profile: &RadiusProfile) -> (Vec<Point3>, usize) {
    let mut skipped = 0usize;
    let positions = canonical
        .positions
        .iter()
        .enumerate()
        .map(|(i, vertex)| {
            let ring = i / canonical.radial_segments;
            let t = ring as f64 / canonical.tubular_segments as f64;
            let center = canonical.centers[ring];
            let offset = vertex.sub_point(center);
            let length = offset.length();
            if length <= Tolerance::ZERO_LENGTH.eps {
                skipped += 1;
                return *vertex;
            }
            center.add_vec(offset.mul_scalar(profile.radius_at(t) / length))
        })
        .collect();
    (positions, skipped)
}

/// Parallel-transported frames at every center sample.
fn compute_rail_frames(
    curve: &impl Curve3,
    centers: &[Point3],
    tol: Tolerance,
) -> Result<Vec<RailFrame>, TubeError> {
    let last = centers.len() - 1;
    let tangents: Vec<Option<Vec3>> = (0..=last)
        .map(|i| {
            curve.tangent_at(i as f64 / last as f64).or_else(|| {
                let prev = centers[i.saturating_sub(1)];
                let next = centers[(i + 1).min(last)];
                let chord = next.sub_point(prev);
                if is_noise(chord, prev) {
                    None
                } else {
                    chord.normalized()
                }
            })
        })
        .collect();

    let first = tangents
        .iter()
        .flatten()
        .next()
        .copied()
        .ok_or(TubeError::DegenerateCurve)?;
    let mut frames = Vec::with_capacity(centers.len());
    let mut prev = RailFrame::from_tangent(first).ok_or(TubeError::DegenerateCurve)?;

    for tangent in tangents {
        let tangent = tangent.unwrap_or(prev.tangent);
        let frame = parallel_transport_frame(&prev, tangent, tol);
        frames.push(frame);
        prev = frame;
    }

    Ok(frames)
}

fn parallel_transport_frame(prev_frame: &RailFrame, new_tangent: Vec3, tol: Tolerance) -> RailFrame {
    let old_tangent = prev_frame.tangent;
    let cross = old_tangent.cross(new_tangent);

    if cross.length_squared() < tol.eps_squared() {
        let flip = if old_tangent.dot(new_tangent) < 0.0 { -1.0 } else { 1.0 };
        return RailFrame {
            tangent: new_tangent,
            normal: prev_frame.normal.mul_scalar(flip),
            binormal: prev_frame.binormal.mul_scalar(flip),
        };
    }

    let axis = cross.normalized().unwrap_or(Vec3::Z);
    let angle = old_tangent.dot(new_tangent).clamp(-1.0, 1.0).acos();
    let normal = rotate_vector(prev_frame.normal, axis, angle)
        .normalized()
        .unwrap_or(prev_frame.normal);
    let binormal = new_tangent
        .cross(normal)
        .normalized()
        .unwrap_or(prev_frame.binormal);

    RailFrame {
        tangent: new_tangent,
        normal,
        binormal,
    }
}

fn rotate_vector(v: Vec3, axis: Vec3, angle: f64) -> Vec3 {
    let (sin_angle, cos_angle) = angle.sin_cos();
    v.mul_scalar(cos_angle)
        .add(axis.cross(v).mul_scalar(sin_angle))
        .add(axis.mul_scalar(axis.dot(v) * (1.0 - cos_angle)))
}
