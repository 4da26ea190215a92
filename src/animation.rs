//! Per-frame animation of the scene.
//!
//! Pulse, float and glow are closed-form in the elapsed time. Spin is the one
//! accumulated quantity and lives on each node's transform.

use std::f64::consts::TAU;

use crate::scene::{LightRig, ParticleField, Scene};

/// Spin speeds are radians per 1/60 s.
const FRAME_RATE: f64 = 60.0;

/// `1 + amplitude * sin(frequency * t + phase)`.
#[must_use]
pub fn pulse_scale(t: f64, phase: f64, amplitude: f64, frequency: f64) -> f64 {
    1.0 + amplitude * (frequency * t + phase).sin()
}

#[must_use]
pub fn float_y(t: f64, rest_y: f64, phase: f64, amplitude: f64, frequency: f64) -> f64 {
    rest_y + amplitude * (frequency * t + phase).sin()
}

#[must_use]
pub fn glow(t: f64, base: f64, amplitude: f64, frequency: f64) -> f64 {
    base + amplitude * (frequency * t).sin()
}

/// Sweeps every animated node once per frame.
///
/// The driver owns no schedule: the caller invokes [`AnimationDriver::tick`]
/// and keeps calling while it returns `true`.
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    elapsed: f64,
    active: bool,
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationDriver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            active: true,
        }
    }

    /// Seconds accumulated over every accepted tick.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Advances time by `dt` seconds and updates every animated node.
    /// Negative or non-finite deltas leave the clock where it is.
    pub fn tick(&mut self, scene: &mut Scene, dt: f64) -> bool {
        if !self.active {
            return false;
        }
        let dt = accepted(dt);
        self.elapsed += dt;
        let t = self.elapsed;
        let frames = dt * FRAME_RATE;

        for (_, node) in scene.iter_mut() {
            let Some(animation) = node.animation else {
                continue;
            };

            if let Some(pulse) = animation.pulse {
                node.transform.scale = pulse_scale(t, pulse.phase, pulse.amplitude, pulse.frequency);
            }
            if let Some(float) = animation.float {
                node.transform.position.y = float_y(
                    t,
                    animation.rest_position.y,
                    float.phase,
                    float.amplitude,
                    float.frequency,
                );
            }
            if animation.spin_speed != 0.0 {
                node.transform.spin = (node.transform.spin + animation.spin_speed * frames).rem_euclid(TAU);
            }
            if let Some(g) = animation.glow {
                // Hover owns the emissive intensity until it is released.
                if !node.is_highlighted() {
                    if let Some(material) = node.material.as_mut() {
                        material.emissive_intensity = glow(t, g.base, g.amplitude, g.frequency);
                    }
                }
            }
        }
        true
    }

    /// Moves the particle systems by `dt`; a stopped driver leaves them alone.
    pub fn advance_particles(&self, particles: &mut ParticleField, dt: f64) -> bool {
        if !self.active {
            return false;
        }
        particles.advance(accepted(dt));
        true
    }

    /// Pulses the point lights at the clock of the last tick.
    pub fn advance_lights(&self, lights: &mut LightRig) -> bool {
        if !self.active {
            return false;
        }
        lights.pulse(self.elapsed);
        true
    }
}

fn accepted(dt: f64) -> f64 {
    if dt.is_finite() && dt > 0.0 { dt } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AnimationConfig;
    use crate::geom::{Point3, uv_sphere};
    use crate::scene::{
        AnimationSpec, Color, DecorationKind, Geometry, MaterialKind, NodeId, NodeRole,
        NodeTransform, SceneNode, Subject, SurfaceMaterial,
    };

    fn animated_scene() -> (Scene, NodeId, NodeId) {
        let mut scene = Scene::new();
        let rest = Point3::new(1.0, 2.0, 0.0);
        let subject = Subject {
            id: "INF-110".to_string(),
            name: "Programación I".to_string(),
            area: "fundamentos".to_string(),
            ..Subject::default()
        };
        let node = scene.add(
            SceneNode::new(
                "INF-110",
                NodeRole::TrunkSegment { subject, index: 0 },
                Geometry::Mesh(Arc::new(uv_sphere(0.25, 8, 6))),
            )
            .with_material(SurfaceMaterial::new(MaterialKind::Node, Color::WHITE))
            .with_transform(NodeTransform::at(rest))
            .with_animation(AnimationSpec::for_subject(&AnimationConfig::default(), 2, rest)),
        );
        let ring = scene.add_child(
            node,
            SceneNode::new("ring", NodeRole::Decoration(DecorationKind::Ring), Geometry::Group)
                .with_animation(AnimationSpec::spinning(Point3::ORIGIN, 0.01)),
        );
        (scene, node, ring)
    }

    #[test]
    fn pulse_is_a_pure_function() {
        let a = pulse_scale(1.234, 0.5, 0.1, 2.0);
        let b = pulse_scale(1.234, 0.5, 0.1, 2.0);
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(pulse_scale(0.0, 0.0, 0.1, 2.0), 1.0);
        assert!((float_y(0.0, 3.0, std::f64::consts::FRAC_PI_2, 0.05, 1.0) - 3.05).abs() < 1e-12);
        assert!((glow(0.0, 0.8, 0.2, 2.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn tick_applies_closed_form_values() {
        let (mut scene, node, _) = animated_scene();
        let mut driver = AnimationDriver::new();
        assert!(driver.tick(&mut scene, 0.5));

        let n = scene.get(node).unwrap();
        let config = AnimationConfig::default();
        assert_eq!(n.transform.scale, pulse_scale(0.5, 2.0 * config.phase_step, 0.1, 2.0));
        assert_eq!(n.transform.position.y, float_y(0.5, 2.0, 2.0, 0.05, 1.0));
        assert_eq!(n.transform.position.x, 1.0);
        assert_eq!(n.material.as_ref().unwrap().emissive_intensity, glow(0.5, 0.8, 0.2, 2.0));
    }

    #[test]
    fn spin_accumulates_per_frame() {
        let (mut scene, _, ring) = animated_scene();
        let mut driver = AnimationDriver::new();
        for _ in 0..10 {
            driver.tick(&mut scene, 1.0 / 60.0);
        }
        let spin = scene.get(ring).unwrap().transform.spin;
        assert!((spin - 0.1).abs() < 1e-9);
    }

    #[test]
    fn bad_deltas_do_not_move_the_clock() {
        let (mut scene, _, _) = animated_scene();
        let mut driver = AnimationDriver::new();
        driver.tick(&mut scene, 0.25);
        driver.tick(&mut scene, -1.0);
        driver.tick(&mut scene, f64::NAN);
        assert_eq!(driver.elapsed(), 0.25);
    }

    #[test]
    fn highlighted_nodes_keep_their_emissive_intensity() {
        let (mut scene, node, _) = animated_scene();
        scene.set_highlight(node, 1.5, 0.8);
        let mut driver = AnimationDriver::new();
        driver.tick(&mut scene, 0.3);
        assert_eq!(scene.get(node).unwrap().material.as_ref().unwrap().emissive_intensity, 1.5);
    }

    #[test]
    fn stopped_driver_does_nothing() {
        let (mut scene, node, _) = animated_scene();
        let mut driver = AnimationDriver::new();
        driver.stop();
        let before = scene.get(node).unwrap().transform;
        assert!(!driver.tick(&mut scene, 0.5));
        assert_eq!(scene.get(node).unwrap().transform, before);
        assert_eq!(driver.elapsed(), 0.0);
    }

    #[test]
    fn point_lights_follow_the_driver_clock() {
        let (mut scene, _, _) = animated_scene();
        let mut lights = LightRig::new(&crate::config::LightsConfig::default());
        let mut driver = AnimationDriver::new();
        driver.tick(&mut scene, 1.0);
        assert!(driver.advance_lights(&mut lights));
        let expected = 2.0 + (1.0f64 * 0.5 + 1.0).sin() * 0.3;
        assert!((lights.points[1].intensity - expected).abs() < 1e-12);

        driver.stop();
        let before = lights.clone();
        assert!(!driver.advance_lights(&mut lights));
        assert_eq!(lights, before);
    }
}
