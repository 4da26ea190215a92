//! Point clouds around the tree: slow ambient drift and a flow spiralling up
//! from the roots to the canopy.
//!
//! Both systems are seeded and advanced with a frame delta; speeds in the
//! config are per 1/60 s.

use std::f64::consts::{PI, TAU};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::{AmbientParticleConfig, FlowParticleConfig, ParticlesConfig};
use crate::geom::{Point3, Vec3};

use super::material::Color;

const FRAME_RATE: f64 = 60.0;
const AMBIENT_SALT: u64 = 0x616d_6269;
const FLOW_SALT: u64 = 0x666c_6f77;
/// Flow radius swells by this fraction at mid climb.
const FLOW_SWELL: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct AmbientParticles {
    pub positions: Vec<Point3>,
    pub colors: Vec<Color>,
    /// Per-point size multiplier in `[1, 4)`.
    pub sizes: Vec<f64>,
    velocities: Vec<Vec3>,
    config: AmbientParticleConfig,
}

impl AmbientParticles {
    #[must_use]
    pub fn new(config: &AmbientParticleConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed ^ AMBIENT_SALT);
        let count = config.count;
        let mut positions = Vec::with_capacity(count);
        let mut colors = Vec::with_capacity(count);
        let mut sizes = Vec::with_capacity(count);
        let mut velocities = Vec::with_capacity(count);
        let (r_min, r_max) = ordered(config.radius_min, config.radius_max);
        let (h_min, h_max) = ordered(config.height_min, config.height_max);

        for _ in 0..count {
            let angle = rng.random_range(0.0..TAU);
            let radius = r_min + rng.random::<f64>() * (r_max - r_min);
            let height = h_min + rng.random::<f64>() * (h_max - h_min);
            positions.push(Point3::new(angle.cos() * radius, height, angle.sin() * radius));

            let hue = 0.5 + rng.random::<f64>() * 0.1;
            let saturation = 0.5 + rng.random::<f64>() * 0.5;
            let lightness = 0.5 + rng.random::<f64>() * 0.5;
            colors.push(Color::from_hsl(hue, saturation, lightness));
            sizes.push(1.0 + rng.random::<f64>() * 3.0);

            let [vx, vy, vz] = config.velocity;
            velocities.push(Vec3::new(
                (rng.random::<f64>() - 0.5) * vx,
                (rng.random::<f64>() - 0.5) * vy,
                (rng.random::<f64>() - 0.5) * vz,
            ));
        }

        Self {
            positions,
            colors,
            sizes,
            velocities,
            config: config.clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[must_use]
    pub fn velocity(&self, index: usize) -> Option<Vec3> {
        self.velocities.get(index).copied()
    }

    /// Drifts every point; a point past the box bounds turns back on that axis.
    pub fn advance(&mut self, dt: f64) {
        let frames = dt * FRAME_RATE;
        let limit = self.config.radius_max.abs().max(self.config.radius_min.abs());
        let (h_min, h_max) = ordered(self.config.height_min, self.config.height_max);

        for (p, v) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            *p = p.add_vec(v.mul_scalar(frames));
            if (p.x > limit && v.x > 0.0) || (p.x < -limit && v.x < 0.0) {
                v.x = -v.x;
            }
            if (p.y > h_max && v.y > 0.0) || (p.y < h_min && v.y < 0.0) {
                v.y = -v.y;
            }
            if (p.z > limit && v.z > 0.0) || (p.z < -limit && v.z < 0.0) {
                v.z = -v.z;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowParticles {
    pub positions: Vec<Point3>,
    pub color: Color,
    progress: Vec<f64>,
    config: FlowParticleConfig,
}

impl FlowParticles {
    #[must_use]
    pub fn new(config: &FlowParticleConfig, color: Color, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed ^ FLOW_SALT);
        let progress: Vec<f64> = (0..config.count).map(|_| rng.random::<f64>()).collect();
        let mut flow = Self {
            positions: vec![Point3::ORIGIN; progress.len()],
            color,
            progress,
            config: config.clone(),
        };
        flow.place();
        flow
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Climb progress of each point in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> &[f64] {
        &self.progress
    }

    /// Point `index` at climb progress `p`.
    #[must_use]
    pub fn position_at(&self, index: usize, p: f64) -> Point3 {
        let cfg = &self.config;
        let y = cfg.start_y + p * (cfg.end_y - cfg.start_y);
        let angle = p * TAU + index as f64;
        let radius = cfg.radius * (1.0 + (p * PI).sin() * FLOW_SWELL);
        Point3::new(angle.cos() * radius, y, angle.sin() * radius)
    }

    /// Points that pass the canopy restart at the roots.
    pub fn advance(&mut self, dt: f64) {
        let step = self.config.speed * dt * FRAME_RATE;
        for p in &mut self.progress {
            *p += step;
            if *p > 1.0 {
                *p = 0.0;
            }
        }
        self.place();
    }

    fn place(&mut self) {
        for i in 0..self.progress.len() {
            self.positions[i] = self.position_at(i, self.progress[i]);
        }
    }
}

/// Both systems plus their shared visibility switch.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleField {
    pub ambient: AmbientParticles,
    pub flow: FlowParticles,
    pub visible: bool,
    pub ambient_style: PointStyle,
    pub flow_style: PointStyle,
}

/// How a point cloud is drawn. Points are always blended additively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointStyle {
    pub size: f64,
    pub opacity: f64,
}

impl ParticleField {
    #[must_use]
    pub fn new(config: &ParticlesConfig, flow_color: Color, seed: u64) -> Self {
        Self {
            ambient: AmbientParticles::new(&config.ambient, seed),
            flow: FlowParticles::new(&config.flow, flow_color, seed),
            visible: config.enabled,
            ambient_style: PointStyle {
                size: config.ambient.size,
                opacity: config.ambient.opacity,
            },
            flow_style: PointStyle {
                size: config.flow.size,
                opacity: config.flow.opacity,
            },
        }
    }

    pub fn advance(&mut self, dt: f64) {
        if !self.visible {
            return;
        }
        self.ambient.advance(dt);
        self.flow.advance(dt);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.ambient.len() + self.flow.len()
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_points_start_inside_the_cylinder_shell() {
        let config = AmbientParticleConfig::default();
        let ambient = AmbientParticles::new(&config, 1);
        assert_eq!(ambient.len(), 200);
        for (i, p) in ambient.positions.iter().enumerate() {
            let r = p.x.hypot(p.z);
            assert!((3.0 - 1e-9..=13.0 + 1e-9).contains(&r));
            assert!((-3.0..=12.0).contains(&p.y));
            let v = ambient.velocity(i).unwrap();
            assert!(v.x.abs() <= 0.001 && v.y.abs() <= 0.0025 && v.z.abs() <= 0.001);
        }
        assert!(ambient.sizes.iter().all(|s| (1.0..4.0).contains(s)));
    }

    #[test]
    fn ambient_points_turn_back_at_the_bounds() {
        let mut config = AmbientParticleConfig::default();
        config.count = 1;
        let mut ambient = AmbientParticles::new(&config, 3);
        ambient.positions[0] = Point3::new(0.0, 12.5, 0.0);
        ambient.velocities[0] = Vec3::new(0.0, 0.004, 0.0);
        ambient.advance(1.0 / 60.0);
        assert!(ambient.velocity(0).unwrap().y < 0.0);
        // Already heading back: no second flip.
        ambient.advance(1.0 / 60.0);
        assert!(ambient.velocity(0).unwrap().y < 0.0);
    }

    #[test]
    fn flow_climbs_and_wraps() {
        let config = FlowParticleConfig::default();
        let mut flow = FlowParticles::new(&config, Color::WHITE, 9);
        assert_eq!(flow.len(), 60);
        flow.progress[0] = 0.999;
        flow.advance(1.0 / 60.0);
        assert_eq!(flow.progress()[0], 0.0);
        assert_eq!(flow.positions[0].y, -1.0);

        let mid = flow.position_at(0, 0.5);
        assert!((mid.y - 3.5).abs() < 1e-12);
        assert!((mid.x.hypot(mid.z) - 1.5 * 1.3).abs() < 1e-12);
    }

    #[test]
    fn fields_are_seeded() {
        let config = ParticlesConfig::default();
        let a = ParticleField::new(&config, Color::WHITE, 4);
        let b = ParticleField::new(&config, Color::WHITE, 4);
        let c = ParticleField::new(&config, Color::WHITE, 5);
        assert_eq!(a, b);
        assert_ne!(a.ambient.positions, c.ambient.positions);
        assert_eq!(a.point_count(), 260);
    }

    #[test]
    fn hidden_field_does_not_move() {
        let mut field = ParticleField::new(&ParticlesConfig::default(), Color::WHITE, 4);
        let before = field.clone();
        field.set_visible(false);
        field.advance(0.5);
        assert_eq!(field.flow.positions, before.flow.positions);
    }
}
