//! Parametric curves used to route roots, trunk and branches.
//!
//! Every curve is parameterized over `[0, 1]`. `CatmullRom3` interpolates its
//! control points; the Bezier types are used for short connectors where only
//! the end points must be hit.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Point3, Tolerance, Vec3};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CurveError {
    #[error("curve requires at least 2 control points, got {count}")]
    TooFewControlPoints { count: usize },
    #[error("control point {index} has non-finite coordinates")]
    NonFiniteControlPoint { index: usize },
    #[error("tension must be finite and within [0, 1], got {0}")]
    TensionOutOfRange(f64),
}

pub trait Curve3 {
    fn point_at(&self, t: f64) -> Point3;

    #[must_use]
    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    #[must_use]
    fn derivative_at(&self, t: f64) -> Vec3 {
        let (a, b) = self.domain();
        let span = b - a;
        let h = Tolerance::DERIVATIVE.relative_to(span);
        if !h.is_finite() || h == 0.0 {
            return Vec3::ZERO;
        }

        let t0 = (t - h).max(a);
        let t1 = (t + h).min(b);
        if t1 == t0 {
            return Vec3::ZERO;
        }

        self.point_at(t1)
            .sub_point(self.point_at(t0))
            .mul_scalar(1.0 / (t1 - t0))
    }

    /// Unit tangent, `None` where the curve has zero velocity.
    ///
    /// Displacements at the rounding level of the coordinates count as zero.
    #[must_use]
    fn tangent_at(&self, t: f64) -> Option<Vec3> {
        let (a, b) = self.domain();
        let h = Tolerance::DERIVATIVE.relative_to(b - a);
        let t0 = (t - h).max(a);
        let t1 = (t + h).min(b);
        let p0 = self.point_at(t0);
        let chord = self.point_at(t1).sub_point(p0);
        if is_noise(chord, p0) {
            return None;
        }
        self.derivative_at(t).normalized()
    }

    /// `divisions + 1` evenly spaced samples including both end points.
    #[must_use]
    fn sample(&self, divisions: usize) -> Vec<Point3> {
        let divisions = divisions.max(1);
        (0..=divisions)
            .map(|i| self.point_at(i as f64 / divisions as f64))
            .collect()
    }
}

/// `true` when `offset` is too short to carry a direction at the magnitude of
/// `near`.
pub(crate) fn is_noise(offset: Vec3, near: Point3) -> bool {
    let scale = 1.0 + near.to_vec3().length();
    Tolerance::new(Tolerance::ZERO_LENGTH.relative_to(scale)).is_zero_vec3(offset)
}

// ─── Catmull-Rom ─────────────────────────────────────────────────────────────

/// Interpolating cardinal spline through every control point.
///
/// Each span is a cubic Hermite segment whose end tangents are
/// `tension * (p[i + 1] - p[i - 1])`; missing neighbours at the ends are
/// reflected (`2 * p0 - p1`). A tension of `0.5` gives the classic uniform
/// Catmull-Rom curve. The global parameter is split evenly over the spans.
#[derive(Debug, Clone, PartialEq)]
pub struct CatmullRom3 {
    points: Vec<Point3>,
    tension: f64,
}

impl CatmullRom3 {
    pub fn new(points: Vec<Point3>, tension: f64) -> Result<Self, CurveError> {
        if points.len() < 2 {
            return Err(CurveError::TooFewControlPoints { count: points.len() });
        }
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(CurveError::NonFiniteControlPoint { index });
        }
        if !tension.is_finite() || !(0.0..=1.0).contains(&tension) {
            return Err(CurveError::TensionOutOfRange(tension));
        }
        Ok(Self { points, tension })
    }

    #[must_use]
    pub fn control_points(&self) -> &[Point3] {
        &self.points
    }

    #[must_use]
    pub fn tension(&self) -> f64 {
        self.tension
    }

    fn span_count(&self) -> usize {
        self.points.len() - 1
    }

    /// Span index and local parameter for a global `t`.
    fn locate(&self, t: f64) -> (usize, f64) {
        let spans = self.span_count();
        let s = t.clamp(0.0, 1.0) * spans as f64;
        let index = (s.floor() as usize).min(spans - 1);
        (index, s - index as f64)
    }

    fn neighbour(&self, index: isize) -> Point3 {
        let n = self.points.len() as isize;
        if index < 0 {
            let p0 = self.points[0];
            let p1 = self.points[1];
            p0.add_vec(p0.sub_point(p1))
        } else if index >= n {
            let last = self.points[(n - 1) as usize];
            let prev = self.points[(n - 2) as usize];
            last.add_vec(last.sub_point(prev))
        } else {
            self.points[index as usize]
        }
    }

    fn span_tangents(&self, index: usize) -> (Vec3, Vec3) {
        let i = index as isize;
        let m0 = self.neighbour(i + 1).sub_point(self.neighbour(i - 1));
        let m1 = self.neighbour(i + 2).sub_point(self.neighbour(i));
        (m0.mul_scalar(self.tension), m1.mul_scalar(self.tension))
    }
}

impl Curve3 for CatmullRom3 {
    fn point_at(&self, t: f64) -> Point3 {
        let (index, u) = self.locate(t);
        let p0 = self.points[index];
        let p1 = self.points[index + 1];
        let (m0, m1) = self.span_tangents(index);

        let u2 = u * u;
        let u3 = u2 * u;
        let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
        let h10 = u3 - 2.0 * u2 + u;
        let h01 = -2.0 * u3 + 3.0 * u2;
        let h11 = u3 - u2;

        Point3::new(
            h00 * p0.x + h10 * m0.x + h01 * p1.x + h11 * m1.x,
            h00 * p0.y + h10 * m0.y + h01 * p1.y + h11 * m1.y,
            h00 * p0.z + h10 * m0.z + h01 * p1.z + h11 * m1.z,
        )
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        let (index, u) = self.locate(t);
        let p0 = self.points[index];
        let p1 = self.points[index + 1];
        let (m0, m1) = self.span_tangents(index);

        let u2 = u * u;
        let d00 = 6.0 * u2 - 6.0 * u;
        let d10 = 3.0 * u2 - 4.0 * u + 1.0;
        let d01 = -6.0 * u2 + 6.0 * u;
        let d11 = 3.0 * u2 - 2.0 * u;

        p0.to_vec3()
            .mul_scalar(d00)
            .add(m0.mul_scalar(d10))
            .add(p1.to_vec3().mul_scalar(d01))
            .add(m1.mul_scalar(d11))
            .mul_scalar(self.span_count() as f64)
    }
}

// ─── Bezier ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticBezier3 {
    pub p0: Point3,
    pub p1: Point3,
    pub p2: Point3,
}

impl QuadraticBezier3 {
    #[must_use]
    pub const fn new(p0: Point3, p1: Point3, p2: Point3) -> Self {
        Self { p0, p1, p2 }
    }

    /// Arc from `from` to `to` whose control point is the midpoint raised by `lift` along +Y.
    #[must_use]
    pub fn arched(from: Point3, to: Point3, lift: f64) -> Self {
        let mid = from.lerp(to, 0.5).add_vec(Vec3::Y.mul_scalar(lift));
        Self::new(from, mid, to)
    }
}

impl Curve3 for QuadraticBezier3 {
    fn point_at(&self, t: f64) -> Point3 {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        weighted_sum(&[(self.p0, u * u), (self.p1, 2.0 * u * t), (self.p2, t * t)])
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let a = self.p1.sub_point(self.p0);
        let b = self.p2.sub_point(self.p1);
        a.mul_scalar(2.0 * u).add(b.mul_scalar(2.0 * t))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier3 {
    pub p0: Point3,
    pub p1: Point3,
    pub p2: Point3,
    pub p3: Point3,
}

impl CubicBezier3 {
    #[must_use]
    pub const fn new(p0: Point3, p1: Point3, p2: Point3, p3: Point3) -> Self {
        Self { p0, p1, p2, p3 }
    }
}

impl Curve3 for CubicBezier3 {
    fn point_at(&self, t: f64) -> Point3 {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let u2 = u * u;
        let t2 = t * t;
        weighted_sum(&[
            (self.p0, u2 * u),
            (self.p1, 3.0 * u2 * t),
            (self.p2, 3.0 * u * t2),
            (self.p3, t2 * t),
        ])
    }

    fn derivative_at(&self, t: f64) -> Vec3 {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let a = self.p1.sub_point(self.p0);
        let b = self.p2.sub_point(self.p1);
        let c = self.p3.sub_point(self.p2);
        a.mul_scalar(3.0 * u * u)
            .add(b.mul_scalar(6.0 * u * t))
            .add(c.mul_scalar(3.0 * t * t))
    }
}

fn weighted_sum(terms: &[(Point3, f64)]) -> Point3 {
    let mut acc = Vec3::ZERO;
    for (p, w) in terms {
        acc = acc.add(p.to_vec3().mul_scalar(*w));
    }
    Point3::new(acc.x, acc.y, acc.z)
}

// ─── CurveSpec ───────────────────────────────────────────────────────────────

/// Control points plus tension, the input of `CatmullRom3`.
///
/// Organic variation is applied with [`CurveSpec::jittered`]: interior points
/// move by a bounded pseudo-random offset drawn from a generator seeded by the
/// caller (the branch index), so rebuilding with the same seed reproduces the
/// same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveSpec {
    pub control_points: Vec<Point3>,
    pub tension: f64,
}

impl CurveSpec {
    #[must_use]
    pub fn new(control_points: Vec<Point3>, tension: f64) -> Self {
        Self {
            control_points,
            tension,
        }
    }

    #[must_use]
    pub fn jittered(mut self, seed: u64, amplitude: f64) -> Self {
        jitter_interior(&mut self.control_points, seed, amplitude);
        self
    }

    pub fn build(&self) -> Result<CatmullRom3, CurveError> {
        CatmullRom3::new(self.control_points.clone(), self.tension)
    }
}

/// Offsets every interior point by up to `amplitude` per axis. End points stay fixed.
pub fn jitter_interior(points: &mut [Point3], seed: u64, amplitude: f64) {
    if points.len() < 3 || !amplitude.is_finite() || amplitude <= 0.0 {
        return;
    }

    let mut rng: StdRng = SeedableRng::seed_from_u64(seed);
    let last = points.len() - 1;
    for p in &mut points[1..last] {
        let offset = Vec3::new(
            rng.random_range(-amplitude..=amplitude),
            rng.random_range(-amplitude..=amplitude),
            rng.random_range(-amplitude..=amplitude),
        );
        *p = p.add_vec(offset);
    }
}
