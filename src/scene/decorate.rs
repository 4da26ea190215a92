//! Ornaments scattered along a curve.
//!
//! Decorators are stateless: they sample the curve and return drawables that
//! carry their own animation parameters. The animation driver moves them.

use std::f64::consts::TAU;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ParticleSettings, RingSettings};
use crate::geom::{Curve3, GeomMesh, Transform, Vec3, torus, uv_sphere};

use super::material::{Color, SurfaceMaterial};
use super::node::{AnimationSpec, DecorationKind, Geometry, NodeRole, NodeTransform, Oscillation, SceneNode};

const RING_RADIAL_SEGMENTS: usize = 8;
const RING_TUBULAR_SEGMENTS: usize = 32;
const PARTICLE_SEGMENTS: usize = 8;
const MIN_RING_OPACITY: f64 = 0.05;

/// A generated ornament, ready to become a scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
    pub kind: DecorationKind,
    pub mesh: Arc<GeomMesh>,
    pub color: Color,
    pub opacity: f64,
    pub transform: NodeTransform,
    pub animation: AnimationSpec,
    /// Curve parameter the ornament was placed at.
    pub t: f64,
}

impl Decoration {
    /// Wraps the ornament in a node using `material` recolored to the ornament color.
    #[must_use]
    pub fn into_node(self, name: impl Into<String>, material: SurfaceMaterial) -> SceneNode {
        SceneNode::new(name, NodeRole::Decoration(self.kind), Geometry::Mesh(self.mesh))
            .with_material(material.with_color(self.color).with_opacity(self.opacity))
            .with_transform(self.transform)
            .with_animation(self.animation)
    }
}

// ─── Rings ───────────────────────────────────────────────────────────────────

/// Torus rings on every `stride`-th sample, perpendicular to the curve.
#[derive(Debug, Clone, PartialEq)]
pub struct RingDecorator {
    pub samples: usize,
    pub stride: usize,
    pub base_radius: f64,
    pub tip_radius: f64,
    pub tube_radius: f64,
    pub spin_speed: f64,
    pub opacity: f64,
    pub opacity_falloff: f64,
}

impl From<&RingSettings> for RingDecorator {
    fn from(settings: &RingSettings) -> Self {
        Self {
            samples: settings.samples,
            stride: settings.stride,
            base_radius: settings.base_radius,
            tip_radius: settings.tip_radius,
            tube_radius: settings.tube_radius,
            spin_speed: settings.spin_speed,
            opacity: settings.opacity,
            opacity_falloff: settings.opacity_falloff,
        }
    }
}

impl RingDecorator {
    #[must_use]
    pub fn decorate(&self, curve: &impl Curve3, color: Color) -> Vec<Decoration> {
        let samples = self.samples.max(1);
        let stride = self.stride.max(1);

        (0..=samples)
            .step_by(stride)
            .enumerate()
            .map(|(ring, i)| {
                let t = i as f64 / samples as f64;
                let center = curve.point_at(t);
                let radius = self.base_radius + (self.tip_radius - self.base_radius) * t;
                // Local +Z of the torus follows the tangent, so the ring plane is
                // perpendicular to the curve.
                let orientation = curve
                    .tangent_at(t)
                    .and_then(|tangent| Transform::rotation_between(Vec3::Z, tangent))
                    .unwrap_or_default();
                let spin_speed = if ring % 2 == 0 {
                    self.spin_speed
                } else {
                    -self.spin_speed
                };
                let opacity = (self.opacity - i as f64 * self.opacity_falloff).max(MIN_RING_OPACITY);

                Decoration {
                    kind: DecorationKind::Ring,
                    mesh: Arc::new(torus(
                        radius,
                        self.tube_radius,
                        RING_RADIAL_SEGMENTS,
                        RING_TUBULAR_SEGMENTS,
                    )),
                    color,
                    opacity,
                    transform: NodeTransform::at(center).with_orientation(orientation),
                    animation: AnimationSpec::spinning(center, spin_speed),
                    t,
                }
            })
            .collect()
    }
}

// ─── Particles ───────────────────────────────────────────────────────────────

/// Small spheres beside the curve, each floating with its own phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleDecorator {
    pub samples: usize,
    pub radius: f64,
    pub jitter: f64,
    pub float_amplitude: f64,
    pub float_speed: f64,
    pub opacity: f64,
}

impl From<&ParticleSettings> for ParticleDecorator {
    fn from(settings: &ParticleSettings) -> Self {
        Self {
            samples: settings.samples,
            radius: settings.radius,
            jitter: settings.jitter,
            float_amplitude: settings.float_amplitude,
            float_speed: settings.float_speed,
            opacity: settings.opacity,
        }
    }
}

impl ParticleDecorator {
    /// Same `seed`, same markers.
    #[must_use]
    pub fn decorate(&self, curve: &impl Curve3, color: Color, seed: u64) -> Vec<Decoration> {
        let samples = self.samples.max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let mesh = Arc::new(uv_sphere(self.radius, PARTICLE_SEGMENTS, PARTICLE_SEGMENTS));
        let jitter = self.jitter.abs();

        (0..=samples)
            .map(|i| {
                let t = i as f64 / samples as f64;
                let along = rng.random_range(-jitter..=jitter);
                let across = rng.random_range(-jitter..=jitter);
                let phase = rng.random_range(0.0..TAU);

                let rest = curve.point_at(t).add_vec(lateral_offset(curve, t, along, across));
                Decoration {
                    kind: DecorationKind::Particle,
                    mesh: Arc::clone(&mesh),
                    color,
                    opacity: self.opacity,
                    transform: NodeTransform::at(rest),
                    animation: AnimationSpec::at_rest(rest).with_float(Oscillation {
                        amplitude: self.float_amplitude,
                        frequency: self.float_speed,
                        phase,
                    }),
                    t,
                }
            })
            .collect()
    }
}

/// Offset in the plane normal to the curve at `t`.
fn lateral_offset(curve: &impl Curve3, t: f64, a: f64, b: f64) -> Vec3 {
    let Some(tangent) = curve.tangent_at(t) else {
        return Vec3::new(a, 0.0, b);
    };
    let Some(u) = tangent.any_perpendicular() else {
        return Vec3::ZERO;
    };
    let v = tangent.cross(u);
    u.mul_scalar(a) + v.mul_scalar(b)
}
