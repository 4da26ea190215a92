//! Perspective camera, view presets and eased transitions.

use std::f64::consts::TAU;
use std::rc::Rc;

use serde::Serialize;

use crate::config::CameraConfig;
use crate::geom::{Point3, Ray3, Vec3};

use super::events::{EventSink, SceneEvent};

/// Render surface size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Width over height; 1.0 for an invalid viewport.
    #[must_use]
    pub fn aspect(&self) -> f64 {
        if self.is_valid() {
            self.width / self.height
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3,
    pub target: Point3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera {
    #[must_use]
    pub fn from_config(config: &CameraConfig, aspect: f64) -> Self {
        Self {
            position: Point3::from_array(config.position),
            target: Point3::from_array(config.target),
            up: Vec3::Y,
            fov: config.fov,
            aspect,
            near: config.near,
            far: config.far,
        }
    }

    /// Screen pixels to normalized device coordinates, y up.
    #[must_use]
    pub fn ndc_from_screen(viewport: Viewport, x: f64, y: f64) -> (f64, f64) {
        (
            (x / viewport.width) * 2.0 - 1.0,
            -(y / viewport.height) * 2.0 + 1.0,
        )
    }

    /// Ray from the eye through an NDC point. `None` when the camera basis
    /// is degenerate (target on the eye, or looking along `up`).
    #[must_use]
    pub fn ray_from_ndc(&self, ndc_x: f64, ndc_y: f64) -> Option<Ray3> {
        let forward = self.target.sub_point(self.position).normalized()?;
        let right = forward.cross(self.up).normalized()?;
        let up = right.cross(forward);
        let half_h = (self.fov.to_radians() * 0.5).tan();
        let half_w = half_h * self.aspect;
        let dir = forward + right * (ndc_x * half_w) + up * (ndc_y * half_h);
        Ray3::new(self.position, dir)
    }

    #[must_use]
    pub fn ray_from_screen(&self, viewport: Viewport, x: f64, y: f64) -> Option<Ray3> {
        let (nx, ny) = Self::ndc_from_screen(viewport, x, y);
        self.ray_from_ndc(nx, ny)
    }

    /// Eye to target distance.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.position.distance_to(self.target)
    }
}

// ─── Controller ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPreset {
    Front,
    Side,
    Top,
    Reset,
    /// Framing a single node, see [`CameraController::focus_on`].
    Focus,
}

impl CameraPreset {
    /// Parses the names used by the wasm and CLI front ends.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "front" => Some(Self::Front),
            "side" => Some(Self::Side),
            "top" => Some(Self::Top),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Started,
    /// Another transition is still running; nothing changed.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Transition {
    preset: CameraPreset,
    from_position: Point3,
    from_target: Point3,
    to_position: Point3,
    to_target: Point3,
    elapsed_ms: f64,
}

/// `2t²` then `-1 + (4 - 2t)t`.
#[must_use]
pub fn ease_in_out_quad(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// Orbit controls plus multi-frame preset transitions.
///
/// Only one transition runs at a time; requests made while one is in flight
/// are rejected rather than queued.
pub struct CameraController {
    camera: Camera,
    config: CameraConfig,
    transition: Option<Transition>,
    auto_rotate: bool,
    active: bool,
    sink: Rc<dyn EventSink>,
}

impl std::fmt::Debug for CameraController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraController")
            .field("camera", &self.camera)
            .field("transition", &self.transition)
            .field("auto_rotate", &self.auto_rotate)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl CameraController {
    #[must_use]
    pub fn new(config: &CameraConfig, aspect: f64, sink: Rc<dyn EventSink>) -> Self {
        Self {
            camera: Camera::from_config(config, aspect),
            config: config.clone(),
            transition: None,
            auto_rotate: config.auto_rotate,
            active: true,
            sink,
        }
    }

    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_aspect(&mut self, aspect: f64) {
        if aspect.is_finite() && aspect > 0.0 {
            self.camera.aspect = aspect;
        }
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.auto_rotate = !self.auto_rotate;
        self.auto_rotate
    }

    /// Teardown: later updates return `false` and do nothing.
    pub fn stop(&mut self) {
        self.active = false;
        self.transition = None;
    }

    /// Starts the eased move to a named view. [`CameraPreset::Focus`] has no
    /// fixed destination and is rejected here.
    pub fn request_transition(&mut self, preset: CameraPreset) -> TransitionOutcome {
        let presets = &self.config.presets;
        let view = match preset {
            CameraPreset::Front => presets.front,
            CameraPreset::Side => presets.side,
            CameraPreset::Top => presets.top,
            CameraPreset::Reset => crate::config::ViewPreset {
                position: self.config.position,
                target: self.config.target,
            },
            CameraPreset::Focus => {
                log::debug!("focus transitions need a point; use focus_on");
                return TransitionOutcome::Rejected;
            }
        };
        self.start(
            preset,
            Point3::from_array(view.position),
            Point3::from_array(view.target),
        )
    }

    /// Looks at `point` from `point + focus_offset`.
    pub fn focus_on(&mut self, point: Point3) -> TransitionOutcome {
        let position = point.add_vec(Vec3::from(self.config.focus_offset));
        self.start(CameraPreset::Focus, position, point)
    }

    fn start(&mut self, preset: CameraPreset, to_position: Point3, to_target: Point3) -> TransitionOutcome {
        if !self.active {
            return TransitionOutcome::Rejected;
        }
        if let Some(running) = &self.transition {
            log::debug!("camera transition to {preset:?} rejected, {:?} in flight", running.preset);
            return TransitionOutcome::Rejected;
        }
        self.transition = Some(Transition {
            preset,
            from_position: self.camera.position,
            from_target: self.camera.target,
            to_position,
            to_target,
            elapsed_ms: 0.0,
        });
        if self.config.transition_ms <= 0.0 {
            self.advance_transition(0.0);
        }
        TransitionOutcome::Started
    }

    /// Rotates around the target by spherical deltas, clamped to the polar limits.
    pub fn orbit(&mut self, delta_azimuth: f64, delta_polar: f64) -> bool {
        if self.transition.is_some() || !self.active {
            return false;
        }
        let offset = self.camera.position.sub_point(self.camera.target);
        let radius = offset.length();
        if radius <= 0.0 || !radius.is_finite() {
            return false;
        }
        let azimuth = offset.x.atan2(offset.z) + delta_azimuth;
        let polar = ((offset.y / radius).clamp(-1.0, 1.0).acos() + delta_polar)
            .clamp(self.config.min_polar_angle, self.config.max_polar_angle);
        self.place(radius, azimuth, polar);
        true
    }

    /// Scales the eye distance by `factor`, clamped to the configured range.
    pub fn zoom(&mut self, factor: f64) -> bool {
        if self.transition.is_some() || !self.active || !(factor.is_finite() && factor > 0.0) {
            return false;
        }
        let offset = self.camera.position.sub_point(self.camera.target);
        let radius = offset.length();
        let Some(dir) = offset.normalized() else {
            return false;
        };
        let radius = (radius * factor).clamp(self.config.min_distance, self.config.max_distance);
        self.camera.position = self.camera.target.add_vec(dir * radius);
        true
    }

    fn place(&mut self, radius: f64, azimuth: f64, polar: f64) {
        let (sin_p, cos_p) = polar.sin_cos();
        let offset = Vec3::new(
            radius * sin_p * azimuth.sin(),
            radius * cos_p,
            radius * sin_p * azimuth.cos(),
        );
        self.camera.position = self.camera.target.add_vec(offset);
    }

    /// Advances a running transition, or auto-rotates when idle.
    pub fn update(&mut self, dt: f64) -> bool {
        if !self.active {
            return false;
        }
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        if self.transition.is_some() {
            self.advance_transition(dt * 1000.0);
        } else if self.auto_rotate {
            // One revolution per minute at speed 1.0.
            let angle = TAU / 60.0 * self.config.auto_rotate_speed * dt;
            self.orbit(angle, 0.0);
        }
        true
    }

    fn advance_transition(&mut self, step_ms: f64) {
        let Some(transition) = self.transition.as_mut() else {
            return;
        };
        transition.elapsed_ms += step_ms;
        let t = if self.config.transition_ms > 0.0 {
            (transition.elapsed_ms / self.config.transition_ms).min(1.0)
        } else {
            1.0
        };
        let eased = ease_in_out_quad(t);
        self.camera.position = transition.from_position.lerp(transition.to_position, eased);
        self.camera.target = transition.from_target.lerp(transition.to_target, eased);

        if t >= 1.0 {
            let preset = transition.preset;
            self.camera.position = transition.to_position;
            self.camera.target = transition.to_target;
            self.transition = None;
            self.sink.publish(SceneEvent::TransitionFinished { preset });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::RecordingSink;

    fn controller() -> (CameraController, RecordingSink) {
        let sink = RecordingSink::new();
        let controller = CameraController::new(&CameraConfig::default(), 1.5, Rc::new(sink.clone()));
        (controller, sink)
    }

    #[test]
    fn screen_center_maps_to_the_view_axis() {
        let viewport = Viewport::new(800.0, 600.0);
        assert_eq!(Camera::ndc_from_screen(viewport, 400.0, 300.0), (0.0, 0.0));
        assert_eq!(Camera::ndc_from_screen(viewport, 0.0, 0.0), (-1.0, 1.0));

        let camera = Camera::from_config(&CameraConfig::default(), viewport.aspect());
        let ray = camera.ray_from_screen(viewport, 400.0, 300.0).unwrap();
        let expected = camera.target.sub_point(camera.position).normalized().unwrap();
        assert!((ray.dir - expected).length() < 1e-12);
        assert_eq!(ray.origin, camera.position);
    }

    #[test]
    fn top_edge_ray_spans_half_the_fov() {
        let mut camera = Camera::from_config(&CameraConfig::default(), 1.0);
        camera.position = Point3::new(0.0, 0.0, 10.0);
        camera.target = Point3::ORIGIN;
        let ray = camera.ray_from_ndc(0.0, 1.0).unwrap();
        let angle = ray.dir.dot(Vec3::new(0.0, 0.0, -1.0)).acos();
        assert!((angle - 37.5_f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn eased_transition_finishes_and_reports() {
        let (mut controller, sink) = controller();
        assert_eq!(controller.request_transition(CameraPreset::Side), TransitionOutcome::Started);
        controller.update(0.5);
        let half = controller.camera().position;
        assert!((half.x - 6.0).abs() < 1e-9, "ease is symmetric at t = 0.5");
        assert!(sink.is_empty());

        controller.update(0.6);
        assert_eq!(controller.camera().position, Point3::new(12.0, 5.0, 0.0));
        assert!(!controller.is_transitioning());
        assert_eq!(
            sink.drain(),
            vec![SceneEvent::TransitionFinished { preset: CameraPreset::Side }]
        );
    }

    #[test]
    fn overlapping_transitions_are_rejected() {
        let (mut controller, sink) = controller();
        controller.request_transition(CameraPreset::Top);
        controller.update(0.2);
        let before = controller.camera().position;
        assert_eq!(controller.focus_on(Point3::new(6.0, 10.0, 0.0)), TransitionOutcome::Rejected);
        assert_eq!(controller.request_transition(CameraPreset::Front), TransitionOutcome::Rejected);
        assert_eq!(controller.camera().position, before);

        controller.update(1.0);
        assert_eq!(
            sink.drain(),
            vec![SceneEvent::TransitionFinished { preset: CameraPreset::Top }]
        );
        assert_eq!(controller.focus_on(Point3::new(6.0, 10.0, 0.0)), TransitionOutcome::Started);
        controller.update(1.0);
        assert_eq!(controller.camera().position, Point3::new(9.0, 12.0, 3.0));
        assert_eq!(controller.camera().target, Point3::new(6.0, 10.0, 0.0));
    }

    #[test]
    fn zoom_and_orbit_respect_limits() {
        let (mut controller, _) = controller();
        controller.zoom(100.0);
        assert!((controller.camera().distance() - 25.0).abs() < 1e-9);
        controller.zoom(0.001);
        assert!((controller.camera().distance() - 5.0).abs() < 1e-9);

        controller.orbit(0.0, -10.0);
        let offset = controller.camera().position.sub_point(controller.camera().target);
        let polar = (offset.y / offset.length()).acos();
        assert!((polar - CameraConfig::default().min_polar_angle).abs() < 1e-9);
    }

    #[test]
    fn auto_rotate_keeps_the_distance() {
        let (mut controller, _) = controller();
        let distance = controller.camera().distance();
        assert!(controller.toggle_auto_rotate());
        for _ in 0..60 {
            controller.update(1.0 / 60.0);
        }
        assert!((controller.camera().distance() - distance).abs() < 1e-9);
        assert_ne!(controller.camera().position, Point3::new(0.0, 5.0, 12.0));
    }

    #[test]
    fn stopped_controller_ignores_everything() {
        let (mut controller, _) = controller();
        controller.stop();
        assert!(!controller.update(0.1));
        assert_eq!(controller.request_transition(CameraPreset::Front), TransitionOutcome::Rejected);
    }
}
