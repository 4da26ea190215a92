use std::ops::{Add, Div, Mul, Neg, Sub};

// ─────────────────────────────────────────────────────────────────────────────
// Vec3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    #[must_use]
    pub const fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[must_use]
    pub const fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[must_use]
    pub const fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    /// Unit vector in the same direction, or `None` for zero/non-finite input.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len.is_finite() && len > 0.0 {
            Some(Self::new(self.x / len, self.y / len, self.z / len))
        } else {
            None
        }
    }

    #[must_use]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        Self::new(
            self.x + (rhs.x - self.x) * t,
            self.y + (rhs.y - self.y) * t,
            self.z + (rhs.z - self.z) * t,
        )
    }

    #[must_use]
    pub const fn mul_scalar(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    #[must_use]
    pub const fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    #[must_use]
    pub const fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Any unit vector perpendicular to `self`.
    ///
    /// Picks the world axis least aligned with the input as reference, the same
    /// rule the tube frames use for their first ring.
    #[must_use]
    pub fn any_perpendicular(self) -> Option<Self> {
        let dir = self.normalized()?;
        let reference = if dir.x.abs() < 0.9 { Self::X } else { Self::Y };
        dir.cross(reference).normalized()
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Vec3::add(self, rhs)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Vec3::sub(self, rhs)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        self.mul_scalar(rhs)
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;
    fn mul(self, rhs: Vec3) -> Self::Output {
        rhs.mul_scalar(self)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Point3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn from_array(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    #[must_use]
    pub const fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    #[must_use]
    pub const fn add_vec(self, v: Vec3) -> Self {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }

    #[must_use]
    pub const fn sub_point(self, rhs: Self) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    #[must_use]
    pub fn lerp(self, rhs: Self, t: f64) -> Self {
        Self::new(
            self.x + (rhs.x - self.x) * t,
            self.y + (rhs.y - self.y) * t,
            self.z + (rhs.z - self.z) * t,
        )
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        self.sub_point(other).length()
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Default for Point3 {
    fn default() -> Self {
        Self::ORIGIN
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(arr: [f64; 3]) -> Self {
        Self::from_array(arr)
    }
}

impl From<Point3> for [f64; 3] {
    fn from(p: Point3) -> Self {
        p.to_array()
    }
}

impl Add<Vec3> for Point3 {
    type Output = Self;
    fn add(self, rhs: Vec3) -> Self::Output {
        self.add_vec(rhs)
    }
}

impl Sub<Vec3> for Point3 {
    type Output = Self;
    fn sub(self, rhs: Vec3) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self::Output {
        self.sub_point(rhs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transform
// ─────────────────────────────────────────────────────────────────────────────

/// Row-major affine 4x4 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    m: [[f64; 4]; 4],
}

impl Transform {
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[must_use]
    pub const fn translate(offset: Vec3) -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, offset.x],
                [0.0, 1.0, 0.0, offset.y],
                [0.0, 0.0, 1.0, offset.z],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[must_use]
    pub fn uniform_scale(s: f64) -> Self {
        Self {
            m: [
                [s, 0.0, 0.0, 0.0],
                [0.0, s, 0.0, 0.0],
                [0.0, 0.0, s, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[must_use]
    pub fn rotate_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, -s, 0.0],
                [0.0, s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[must_use]
    pub fn rotate_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [
                [c, -s, 0.0, 0.0],
                [s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Rodrigues rotation about an arbitrary axis through the origin.
    #[must_use]
    pub fn rotate_axis(axis: Vec3, angle: f64) -> Option<Self> {
        let axis = axis.normalized()?;
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);

        Some(Self {
            m: [
                [t * x * x + c, t * x * y - s * z, t * x * z + s * y, 0.0],
                [t * x * y + s * z, t * y * y + c, t * y * z - s * x, 0.0],
                [t * x * z - s * y, t * y * z + s * x, t * z * z + c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        })
    }

    /// Shortest rotation carrying direction `from` onto direction `to`.
    ///
    /// Used to orient ring decorations so their local +Z follows a curve tangent.
    /// Returns `None` if either direction is degenerate.
    #[must_use]
    pub fn rotation_between(from: Vec3, to: Vec3) -> Option<Self> {
        let from = from.normalized()?;
        let to = to.normalized()?;
        let dot = from.dot(to).clamp(-1.0, 1.0);

        if dot >= 1.0 - Tolerance::ANGLE.eps {
            return Some(Self::identity());
        }
        if dot <= -1.0 + Tolerance::ANGLE.eps {
            let axis = from.any_perpendicular()?;
            return Self::rotate_axis(axis, std::f64::consts::PI);
        }

        Self::rotate_axis(from.cross(to), dot.acos())
    }

    #[must_use]
    pub fn compose(self, other: Self) -> Self {
        let mut result = Self::identity();
        for i in 0..4 {
            for j in 0..4 {
                result.m[i][j] = self.m[i][0] * other.m[0][j]
                    + self.m[i][1] * other.m[1][j]
                    + self.m[i][2] * other.m[2][j]
                    + self.m[i][3] * other.m[3][j];
            }
        }
        result
    }

    /// Largest column length of the linear part; bounds how far the transform stretches.
    #[must_use]
    pub fn max_scale(self) -> f64 {
        (0..3)
            .map(|col| Vec3::new(self.m[0][col], self.m[1][col], self.m[2][col]).length())
            .fold(0.0, f64::max)
    }

    #[must_use]
    pub fn apply_point(self, p: Point3) -> Point3 {
        let x = self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2] * p.z + self.m[0][3];
        let y = self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2] * p.z + self.m[1][3];
        let z = self.m[2][0] * p.x + self.m[2][1] * p.y + self.m[2][2] * p.z + self.m[2][3];
        Point3::new(x, y, z)
    }

    #[must_use]
    pub fn apply_vec(self, v: Vec3) -> Vec3 {
        let x = self.m[0][0] * v.x + self.m[0][1] * v.y + self.m[0][2] * v.z;
        let y = self.m[1][0] * v.x + self.m[1][1] * v.y + self.m[1][2] * v.z;
        let z = self.m[2][0] * v.x + self.m[2][1] * v.y + self.m[2][2] * v.z;
        Vec3::new(x, y, z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Transform {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BBox
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min: Point3,
    pub max: Point3,
}

impl BBox {
    #[must_use]
    pub const fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn from_points(points: &[Point3]) -> Option<Self> {
        let mut iter = points.iter().copied();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), Self::expand_point))
    }

    /// Axis-aligned box enclosing a sphere.
    #[must_use]
    pub fn from_sphere(center: Point3, radius: f64) -> Self {
        let r = radius.abs();
        Self::new(
            Point3::new(center.x - r, center.y - r, center.z - r),
            Point3::new(center.x + r, center.y + r, center.z + r),
        )
    }

    #[must_use]
    pub fn center(self) -> Point3 {
        self.min.lerp(self.max, 0.5)
    }

    #[must_use]
    pub fn size(self) -> Vec3 {
        self.max.sub_point(self.min)
    }

    #[must_use]
    pub fn contains_point(self, p: Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[must_use]
    pub fn expand_point(self, p: Point3) -> Self {
        Self::new(
            Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        )
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        self.expand_point(other.min).expand_point(other.max)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ray3
// ─────────────────────────────────────────────────────────────────────────────

/// Half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray3 {
    pub origin: Point3,
    pub dir: Vec3,
}

impl Ray3 {
    /// Builds a ray, normalizing `dir`. Returns `None` for a degenerate direction.
    #[must_use]
    pub fn new(origin: Point3, dir: Vec3) -> Option<Self> {
        if !origin.is_finite() {
            return None;
        }
        Some(Self {
            origin,
            dir: dir.normalized()?,
        })
    }

    #[must_use]
    pub fn at(self, t: f64) -> Point3 {
        self.origin.add_vec(self.dir.mul_scalar(t))
    }

    /// Distance along the ray to the first intersection with a sphere.
    ///
    /// A ray starting inside the sphere reports the exit distance.
    #[must_use]
    pub fn intersect_sphere(self, center: Point3, radius: f64) -> Option<f64> {
        let oc = self.origin.sub_point(center);
        let b = oc.dot(self.dir);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if !disc.is_finite() || disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        let near = -b - sqrt_disc;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + sqrt_disc;
        (far >= 0.0).then_some(far)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tolerance
// ─────────────────────────────────────────────────────────────────────────────

/// Tolerance configuration for geometric operations.
///
/// - `Tolerance::DEFAULT` - general comparisons (1e-9)
/// - `Tolerance::ZERO_LENGTH` - degenerate vectors and offsets (1e-12)
/// - `Tolerance::DERIVATIVE` - numerical differentiation step (1e-6)
/// - `Tolerance::ANGLE` - angular comparisons in radians (1e-9)
/// - `Tolerance::LOOSE` - coarse comparisons, mostly in tests (1e-6)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    pub const DEFAULT: Self = Self { eps: 1e-9 };
    pub const ZERO_LENGTH: Self = Self { eps: 1e-12 };
    pub const DERIVATIVE: Self = Self { eps: 1e-6 };
    pub const ANGLE: Self = Self { eps: 1e-9 };
    pub const LOOSE: Self = Self { eps: 1e-6 };

    #[must_use]
    pub const fn new(eps: f64) -> Self {
        Self { eps }
    }

    #[must_use]
    pub const fn default_geom() -> Self {
        Self::DEFAULT
    }

    #[must_use]
    pub const fn eps_squared(self) -> f64 {
        self.eps * self.eps
    }

    #[must_use]
    pub fn relative_to(self, span: f64) -> f64 {
        self.eps * span.abs()
    }

    #[must_use]
    pub fn approx_eq_point3(self, a: Point3, b: Point3) -> bool {
        a.sub_point(b).length_squared() <= self.eps_squared()
    }

    #[must_use]
    pub fn is_zero_vec3(self, v: Vec3) -> bool {
        v.length_squared() <= self.eps_squared()
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operators() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(2.0 * a, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(-a, Vec3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_any_perpendicular_is_orthogonal() {
        for dir in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(0.3, -2.0, 0.7)] {
            let p = dir.any_perpendicular().unwrap();
            assert!(p.dot(dir).abs() < 1e-12);
            assert!((p.length() - 1.0).abs() < 1e-12);
        }
        assert!(Vec3::ZERO.any_perpendicular().is_none());
    }

    #[test]
    fn test_rotation_between_maps_from_onto_to() {
        let cases = [
            (Vec3::Z, Vec3::new(1.0, 1.0, 0.0)),
            (Vec3::Z, Vec3::Z),
            (Vec3::Z, -Vec3::Z),
            (Vec3::X, Vec3::new(-0.2, 0.5, 0.9)),
        ];
        for (from, to) in cases {
            let r = Transform::rotation_between(from, to).unwrap();
            let mapped = r.apply_vec(from);
            let expected = to.normalized().unwrap();
            assert!((mapped - expected).length() < 1e-9, "{from:?} -> {to:?} gave {mapped:?}");
        }
    }

    #[test]
    fn test_transform_compose_order() {
        let t = Transform::translate(Vec3::new(1.0, 0.0, 0.0)) * Transform::uniform_scale(2.0);
        let p = t.apply_point(Point3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Point3::new(3.0, 2.0, 2.0));
        assert!((t.max_scale() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_ray_sphere_hit_and_miss() {
        let ray = Ray3::new(Point3::new(0.0, 0.0, -5.0), Vec3::Z).unwrap();
        let hit = ray.intersect_sphere(Point3::ORIGIN, 1.0).unwrap();
        assert!((hit - 4.0).abs() < 1e-12);

        assert!(ray.intersect_sphere(Point3::new(3.0, 0.0, 0.0), 1.0).is_none());
        // Sphere behind the origin.
        assert!(ray.intersect_sphere(Point3::new(0.0, 0.0, -10.0), 1.0).is_none());
    }

    #[test]
    fn test_ray_rejects_zero_direction() {
        assert!(Ray3::new(Point3::ORIGIN, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_bbox_from_sphere_contains_center() {
        let bbox = BBox::from_sphere(Point3::new(1.0, 2.0, 3.0), 0.5);
        assert!(bbox.contains_point(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(bbox.size(), Vec3::new(1.0, 1.0, 1.0));
    }
}
