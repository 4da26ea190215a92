//! One running knowledge tree: assembly, per-frame animation, camera and picking.
//!
//! The host owns the loop. It calls [`Session::frame`] once per display frame
//! and forwards pointer input; everything else is state on the session.

use std::rc::Rc;

use serde::Serialize;

use crate::animation::AnimationDriver;
use crate::config::{BloomConfig, ConfigError, TreeConfig};
use crate::geom::Point3;
use crate::interaction::{
    CameraController, CameraPreset, EventSink, HoverChange, PickOutcome, PickingError,
    PickingService, TransitionOutcome, Viewport,
};
use crate::scene::{
    BuildSummary, Catalog, Color, ContentError, LightRig, NodeId, ParticleField, Scene,
    SceneStats, SurfaceMaterial, TreeAssembler, TreeBuild,
};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("the tree has not been built or was torn down")]
    TreeNotBuilt,
    #[error("no node for entity `{0}`")]
    UnknownEntity(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Picking(#[from] PickingError),
}

/// Bloom switch plus the parameters a renderer needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectsState {
    pub bloom_enabled: bool,
    pub bloom: BloomConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub role: &'static str,
    pub geometry: &'static str,
    pub parent: Option<NodeId>,
    pub world_position: [f64; 3],
    pub scale: f64,
    pub spin: f64,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<SurfaceMaterial>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraSnapshot {
    pub position: [f64; 3],
    pub target: [f64; 3],
    pub fov: f64,
    pub aspect: f64,
    pub transitioning: bool,
    pub auto_rotate: bool,
}

/// Per-frame view of the scene for hosts that render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSnapshot {
    pub elapsed: f64,
    pub nodes: Vec<NodeSnapshot>,
    pub camera: CameraSnapshot,
    pub hovered: Option<NodeId>,
    pub selected: Option<NodeId>,
    pub particles_visible: bool,
    pub particle_count: usize,
    pub effects: EffectsState,
    pub lights: LightRig,
}

pub struct Session {
    config: TreeConfig,
    catalog: Catalog,
    build: Option<TreeBuild>,
    driver: AnimationDriver,
    camera: CameraController,
    picking: PickingService,
    particles: ParticleField,
    lights: LightRig,
    bloom_enabled: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("built", &self.build.is_some())
            .field("driver", &self.driver)
            .field("camera", &self.camera)
            .field("picking", &self.picking)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Validates the config, assembles the tree and starts every subsystem.
    pub fn new(
        config: TreeConfig,
        catalog: Catalog,
        viewport: Viewport,
        sink: Rc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let mut picking = PickingService::new(viewport, sink.clone())?
            .with_drag_threshold(config.interaction.drag_threshold_px);
        let build = TreeAssembler::new(&config, sink.clone()).assemble(&catalog);
        picking.sync_targets(&build.scene);

        let camera = CameraController::new(&config.camera, viewport.aspect(), sink);
        let flow_color = Color::from_hex(config.palette.fallback());
        let particles = ParticleField::new(&config.particles, flow_color, config.seed);
        let lights = LightRig::new(&config.lights);

        Ok(Self {
            bloom_enabled: config.effects.bloom_enabled,
            config,
            catalog,
            build: Some(build),
            driver: AnimationDriver::new(),
            camera,
            picking,
            particles,
            lights,
        })
    }

    /// Parses both JSON documents, then behaves like [`Session::new`].
    pub fn from_json(
        config_json: Option<&str>,
        catalog_json: Option<&str>,
        viewport: Viewport,
        sink: Rc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        let config = match config_json {
            Some(json) => TreeConfig::from_json(json)?,
            None => TreeConfig::default(),
        };
        let catalog = match catalog_json {
            Some(json) => Catalog::from_json(json)?,
            None => Catalog::sample()?,
        };
        Self::new(config, catalog, viewport, sink)
    }

    fn built(&self) -> Result<&TreeBuild, EngineError> {
        self.build.as_ref().ok_or(EngineError::TreeNotBuilt)
    }

    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn scene(&self) -> Result<&Scene, EngineError> {
        Ok(&self.built()?.scene)
    }

    pub fn interactive(&self) -> Result<&[NodeId], EngineError> {
        Ok(&self.built()?.interactive)
    }

    pub fn summary(&self) -> Result<&BuildSummary, EngineError> {
        Ok(&self.built()?.summary)
    }

    pub fn stats(&self) -> Result<SceneStats, EngineError> {
        Ok(self.built()?.scene.stats())
    }

    #[must_use]
    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    #[must_use]
    pub fn picking(&self) -> &PickingService {
        &self.picking
    }

    #[must_use]
    pub fn particles(&self) -> &ParticleField {
        &self.particles
    }

    #[must_use]
    pub fn lights(&self) -> &LightRig {
        &self.lights
    }

    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.driver.elapsed()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.build.is_some() && self.driver.is_active()
    }

    /// Advances animation, particles and the camera by `dt` seconds. Returns
    /// `false` once the session has been torn down.
    pub fn frame(&mut self, dt: f64) -> bool {
        let Some(build) = self.build.as_mut() else {
            return false;
        };
        if !self.driver.tick(&mut build.scene, dt) {
            return false;
        }
        self.driver.advance_lights(&mut self.lights);
        self.driver.advance_particles(&mut self.particles, dt);
        self.camera.update(dt);
        self.picking.sync_targets(&build.scene);
        true
    }

    // ─── Pointer input ───────────────────────────────────────────────────

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        if self.build.is_some() {
            self.picking.pointer_down(x, y);
        }
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<NodeId> {
        self.build.as_ref()?;
        let change = self.picking.pointer_move(self.camera.camera(), x, y);
        self.apply_hover(change);
        self.picking.hovered()
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> Option<PickOutcome> {
        self.build.as_ref()?;
        let outcome = self.picking.pointer_up(self.camera.camera(), x, y)?;
        self.follow_selection();
        Some(outcome)
    }

    /// Aims the spotlight at the selected node, or rests it once the
    /// selection is gone.
    fn follow_selection(&mut self) {
        let Some(build) = self.build.as_ref() else {
            return;
        };
        match self.picking.selected() {
            Some(node) => self.lights.focus_on(build.scene.world_position(node)),
            None if self.lights.is_focused() => self.lights.unfocus(),
            None => {}
        }
    }

    /// Pointer left the surface.
    pub fn pointer_leave(&mut self) {
        let change = self.picking.clear_hover();
        self.apply_hover(change);
    }

    fn apply_hover(&mut self, change: Option<HoverChange>) {
        let (Some(change), Some(build)) = (change, self.build.as_mut()) else {
            return;
        };
        if let Some(previous) = change.previous {
            build.scene.clear_highlight(previous);
        }
        if let Some(current) = change.current {
            let interaction = &self.config.interaction;
            build.scene.set_highlight(
                current,
                interaction.hover_emissive_intensity,
                interaction.hover_decoration_opacity,
            );
        }
    }

    /// Applying the same size twice changes nothing.
    pub fn resize(&mut self, viewport: Viewport) -> Result<(), EngineError> {
        self.picking.resize(viewport)?;
        self.camera.set_aspect(viewport.aspect());
        Ok(())
    }

    // ─── Filters and camera ──────────────────────────────────────────────

    /// Shows only `area` (`"all"` shows everything). Returns the number of
    /// interactive nodes left visible.
    pub fn filter_by_area(&mut self, area: &str) -> Result<usize, EngineError> {
        let build = self.build.as_mut().ok_or(EngineError::TreeNotBuilt)?;
        let visible = build.scene.filter_by_area(area);
        self.picking.sync_targets(&build.scene);
        let hidden = |node: Option<NodeId>| {
            node.is_some_and(|node| !build.scene.is_visible_in_world(node))
        };
        let hidden_hover = hidden(self.picking.hovered());
        let hidden_selection = hidden(self.picking.selected());
        if hidden_hover {
            let change = self.picking.clear_hover();
            self.apply_hover(change);
        }
        if hidden_selection {
            self.picking.clear_selection();
            self.follow_selection();
        }
        log::debug!("area filter `{area}` leaves {visible} nodes visible");
        Ok(visible)
    }

    pub fn show_all(&mut self) -> Result<usize, EngineError> {
        self.filter_by_area("all")
    }

    /// Moves the camera to frame the node of `entity_id`.
    pub fn focus_entity(&mut self, entity_id: &str) -> Result<TransitionOutcome, EngineError> {
        let scene = &self.built()?.scene;
        let node = scene
            .find_by_entity_id(entity_id)
            .ok_or_else(|| EngineError::UnknownEntity(entity_id.to_string()))?;
        let point: Point3 = scene.world_position(node);
        Ok(self.camera.focus_on(point))
    }

    pub fn camera_preset(&mut self, preset: CameraPreset) -> TransitionOutcome {
        self.camera.request_transition(preset)
    }

    pub fn orbit(&mut self, delta_azimuth: f64, delta_polar: f64) -> bool {
        self.camera.orbit(delta_azimuth, delta_polar)
    }

    pub fn zoom(&mut self, factor: f64) -> bool {
        self.camera.zoom(factor)
    }

    pub fn toggle_auto_rotate(&mut self) -> bool {
        self.camera.toggle_auto_rotate()
    }

    pub fn toggle_bloom(&mut self) -> bool {
        self.bloom_enabled = !self.bloom_enabled;
        self.bloom_enabled
    }

    pub fn toggle_particles(&mut self) -> bool {
        let visible = !self.particles.visible;
        self.particles.set_visible(visible);
        visible
    }

    #[must_use]
    pub fn effects(&self) -> EffectsState {
        EffectsState {
            bloom_enabled: self.bloom_enabled,
            bloom: self.config.effects.bloom,
        }
    }

    // ─── Snapshots and teardown ──────────────────────────────────────────

    pub fn snapshot(&self) -> Result<SceneSnapshot, EngineError> {
        let scene = &self.built()?.scene;
        let nodes = scene
            .iter()
            .map(|(id, node)| NodeSnapshot {
                id,
                name: node.name.clone(),
                role: node.role.kind_name(),
                geometry: node.geometry.kind_name(),
                parent: node.parent(),
                world_position: scene.world_position(id).to_array(),
                scale: node.transform.scale,
                spin: node.transform.spin,
                visible: scene.is_visible_in_world(id),
                entity_id: node.entity_id().map(str::to_string),
                area: node.area.clone(),
                material: node.material.clone(),
            })
            .collect();
        let camera = self.camera.camera();
        Ok(SceneSnapshot {
            elapsed: self.driver.elapsed(),
            nodes,
            camera: CameraSnapshot {
                position: camera.position.to_array(),
                target: camera.target.to_array(),
                fov: camera.fov,
                aspect: camera.aspect,
                transitioning: self.camera.is_transitioning(),
                auto_rotate: self.camera.auto_rotate(),
            },
            hovered: self.picking.hovered(),
            selected: self.picking.selected(),
            particles_visible: self.particles.visible,
            particle_count: self.particles.point_count(),
            effects: self.effects(),
            lights: self.lights.clone(),
        })
    }

    /// Stops every loop and releases the scene. Later calls report
    /// [`EngineError::TreeNotBuilt`] and `frame` returns `false`.
    pub fn teardown(&mut self) {
        self.driver.stop();
        self.camera.stop();
        self.picking.clear();
        self.particles.set_visible(false);
        if let Some(mut build) = self.build.take() {
            build.scene.clear();
        }
        log::info!("session torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{RecordingSink, SceneEvent};

    fn session() -> (Session, RecordingSink) {
        let sink = RecordingSink::new();
        let session = Session::new(
            TreeConfig::default(),
            Catalog::sample().unwrap(),
            Viewport::new(1280.0, 720.0),
            Rc::new(sink.clone()),
        )
        .unwrap();
        (session, sink)
    }

    #[test]
    fn new_session_publishes_tree_built() {
        let (session, sink) = session();
        let events = sink.drain();
        assert!(matches!(events.as_slice(), [SceneEvent::TreeBuilt { .. }]));
        assert_eq!(
            session.summary().unwrap().interactive_count,
            session.interactive().unwrap().len()
        );
        assert!(session.picking().target_count() > 0);
    }

    #[test]
    fn invalid_viewport_fails_construction() {
        let err = Session::new(
            TreeConfig::default(),
            Catalog::sample().unwrap(),
            Viewport::new(0.0, 0.0),
            Rc::new(RecordingSink::new()),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Picking(_)));
    }

    #[test]
    fn frames_advance_time() {
        let (mut session, _) = session();
        for _ in 0..30 {
            assert!(session.frame(1.0 / 60.0));
        }
        assert!((session.elapsed() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn filter_then_show_all() {
        let (mut session, _) = session();
        let total = session.stats().unwrap().interactive;
        let web = session.filter_by_area("web").unwrap();
        assert!(web < total);
        assert_eq!(session.picking().target_count(), web);
        assert_eq!(session.show_all().unwrap(), total);
    }

    #[test]
    fn focus_on_unknown_entity_is_an_error() {
        let (mut session, _) = session();
        assert!(matches!(
            session.focus_entity("NOPE"),
            Err(EngineError::UnknownEntity(_))
        ));
        let first = session.catalog().trunk[0].id.clone();
        assert_eq!(session.focus_entity(&first).unwrap(), TransitionOutcome::Started);
        assert_eq!(session.camera_preset(CameraPreset::Top), TransitionOutcome::Rejected);
    }

    #[test]
    fn resize_is_idempotent() {
        let (mut session, _) = session();
        session.resize(Viewport::new(640.0, 480.0)).unwrap();
        let once = session.snapshot().unwrap().camera;
        session.resize(Viewport::new(640.0, 480.0)).unwrap();
        assert_eq!(session.snapshot().unwrap().camera, once);
        assert!(session.resize(Viewport::new(-1.0, 480.0)).is_err());
    }

    #[test]
    fn toggles_flip_state() {
        let (mut session, _) = session();
        assert!(!session.toggle_bloom());
        assert!(!session.effects().bloom_enabled);
        assert!(session.toggle_auto_rotate());
        assert!(!session.toggle_particles());
    }

    #[test]
    fn teardown_stops_everything() {
        let (mut session, _) = session();
        session.teardown();
        assert!(!session.frame(0.016));
        assert!(!session.is_active());
        assert!(matches!(session.stats(), Err(EngineError::TreeNotBuilt)));
        assert!(session.pointer_move(10.0, 10.0).is_none());
    }

    fn select_from_above(session: &mut Session, entity_id: &str) -> NodeId {
        let scene = session.scene().unwrap();
        let node = scene.find_by_entity_id(entity_id).unwrap();
        let origin = scene.world_position(node).add_vec(crate::geom::Vec3::new(0.0, 4.0, 0.0));
        let ray = crate::geom::Ray3::new(origin, -crate::geom::Vec3::Y);
        let outcome = session.picking.click_ray(ray);
        session.follow_selection();
        outcome.node().expect("node under the ray")
    }

    #[test]
    fn filtering_out_the_selection_clears_it() {
        let (mut session, sink) = session();
        let selected = select_from_above(&mut session, "web");
        assert_eq!(session.picking().selected(), Some(selected));
        assert!(session.lights().is_focused());
        sink.drain();

        session.filter_by_area("web").unwrap();
        assert_eq!(session.picking().selected(), Some(selected), "still visible");
        assert!(sink.is_empty());

        session.filter_by_area("ia").unwrap();
        assert!(session.picking().selected().is_none());
        assert_eq!(sink.drain(), vec![SceneEvent::SelectionCleared]);
        assert!(!session.lights().is_focused());
        assert_eq!(session.lights().spotlight.intensity, 1.0);
        assert!(session.snapshot().unwrap().selected.is_none());
    }

    #[test]
    fn spotlight_follows_selection_and_lights_pulse_per_frame() {
        let (mut session, _) = session();
        assert_eq!(session.lights().spotlight.intensity, 0.0);
        let selected = select_from_above(&mut session, "ia");
        let target = session.scene().unwrap().world_position(selected).to_array();
        let snapshot = session.snapshot().unwrap();
        assert_eq!(snapshot.lights.spotlight.target, target);
        assert_eq!(snapshot.lights.spotlight.intensity, 5.0);

        session.frame(2.0);
        let expected = 2.0 + (2.0f64 * 0.5).sin() * 0.3;
        assert!((session.lights().points[0].intensity - expected).abs() < 1e-12);
    }
}
