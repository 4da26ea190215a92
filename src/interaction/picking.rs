//! Ray picking of interactive nodes with hover, click and drag handling.
//!
//! Targets are world-space bounding spheres refreshed by [`PickingService::sync_targets`];
//! a BVH over their boxes narrows each ray before the exact sphere test.

use std::rc::Rc;

use crate::geom::{BBox, Bvh, Point3, Ray3};
use crate::scene::{NodeId, Scene};

use super::camera::{Camera, Viewport};
use super::events::{EventSink, SceneEvent};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PickingError {
    #[error("viewport must be finite and non-empty, got {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickOutcome {
    Hit { node: NodeId, distance: f64 },
    Miss,
}

impl PickOutcome {
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Hit { node, .. } => Some(*node),
            Self::Miss => None,
        }
    }
}

/// Hovered node before and after a hover update that changed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverChange {
    pub previous: Option<NodeId>,
    pub current: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
struct PickTarget {
    node: NodeId,
    entity_id: String,
    center: Point3,
    radius: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Press {
    x: f64,
    y: f64,
    dragged: bool,
}

pub struct PickingService {
    viewport: Viewport,
    drag_threshold: f64,
    targets: Vec<PickTarget>,
    bvh: Option<Bvh>,
    hovered: Option<NodeId>,
    selected: Option<NodeId>,
    press: Option<Press>,
    sink: Rc<dyn EventSink>,
}

impl std::fmt::Debug for PickingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickingService")
            .field("viewport", &self.viewport)
            .field("targets", &self.targets.len())
            .field("hovered", &self.hovered)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

const DEFAULT_DRAG_THRESHOLD: f64 = 5.0;

impl PickingService {
    pub fn new(viewport: Viewport, sink: Rc<dyn EventSink>) -> Result<Self, PickingError> {
        check_viewport(viewport)?;
        Ok(Self {
            viewport,
            drag_threshold: DEFAULT_DRAG_THRESHOLD,
            targets: Vec::new(),
            bvh: None,
            hovered: None,
            selected: None,
            press: None,
            sink,
        })
    }

    #[must_use]
    pub fn with_drag_threshold(mut self, pixels: f64) -> Self {
        self.drag_threshold = pixels.max(0.0);
        self
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, viewport: Viewport) -> Result<(), PickingError> {
        check_viewport(viewport)?;
        self.viewport = viewport;
        Ok(())
    }

    #[must_use]
    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    #[must_use]
    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Rebuilds the target set from the visible interactive nodes of `scene`.
    pub fn sync_targets(&mut self, scene: &Scene) {
        self.targets.clear();
        for (id, node) in scene.iter() {
            let Some(entity_id) = node.entity_id() else {
                continue;
            };
            if !scene.is_visible_in_world(id) {
                continue;
            }
            if let Some((center, radius)) = scene.world_bounds(id) {
                self.targets.push(PickTarget {
                    node: id,
                    entity_id: entity_id.to_string(),
                    center,
                    radius,
                });
            }
        }
        let boxes: Vec<BBox> = self
            .targets
            .iter()
            .map(|t| BBox::from_sphere(t.center, t.radius))
            .collect();
        self.bvh = Bvh::build(&boxes);
    }

    /// Drops every target, the hover and the selection without publishing.
    pub fn clear(&mut self) {
        self.targets.clear();
        self.bvh = None;
        self.hovered = None;
        self.selected = None;
        self.press = None;
    }

    /// Nearest target along `ray`.
    #[must_use]
    pub fn pick_ray(&self, ray: Ray3) -> PickOutcome {
        let Some(bvh) = &self.bvh else {
            return PickOutcome::Miss;
        };
        let hit = bvh.closest_hit(ray, f64::MAX, |prim| {
            self.targets
                .get(prim)
                .and_then(|target| ray.intersect_sphere(target.center, target.radius))
        });
        match hit.and_then(|(prim, distance)| Some((self.targets.get(prim)?, distance))) {
            Some((target, distance)) => {
                log::debug!("pick hit {} at {distance:.3}", target.entity_id);
                PickOutcome::Hit {
                    node: target.node,
                    distance,
                }
            }
            None => PickOutcome::Miss,
        }
    }

    fn screen_ray(&self, camera: &Camera, x: f64, y: f64) -> Option<Ray3> {
        camera.ray_from_screen(self.viewport, x, y)
    }

    fn entity_of(&self, node: NodeId) -> String {
        self.targets
            .iter()
            .find(|t| t.node == node)
            .map(|t| t.entity_id.clone())
            .unwrap_or_default()
    }

    /// Updates the hovered node; `None` when it did not change.
    pub fn hover_ray(&mut self, ray: Option<Ray3>) -> Option<HoverChange> {
        let current = ray.and_then(|ray| self.pick_ray(ray).node());
        if current == self.hovered {
            return None;
        }
        let previous = self.hovered;
        if let Some(node) = previous {
            self.sink.publish(SceneEvent::Unhover { node });
        }
        self.hovered = current;
        if let Some(node) = current {
            let entity_id = self.entity_of(node);
            self.sink.publish(SceneEvent::Hover { node, entity_id });
        }
        Some(HoverChange { previous, current })
    }

    pub fn hover_at(&mut self, camera: &Camera, x: f64, y: f64) -> Option<HoverChange> {
        let ray = self.screen_ray(camera, x, y);
        self.hover_ray(ray)
    }

    /// Ends a hover without a pick, for example when the pointer leaves.
    pub fn clear_hover(&mut self) -> Option<HoverChange> {
        self.hover_ray(None)
    }

    /// Selects the hit node or clears the selection on a miss.
    pub fn click_ray(&mut self, ray: Option<Ray3>) -> PickOutcome {
        let outcome = ray.map_or(PickOutcome::Miss, |ray| self.pick_ray(ray));
        match outcome {
            PickOutcome::Hit { node, .. } => {
                self.selected = Some(node);
                let entity_id = self.entity_of(node);
                self.sink.publish(SceneEvent::ClickResolved { node, entity_id });
            }
            PickOutcome::Miss => {
                self.clear_selection();
            }
        }
        outcome
    }

    /// Drops the selection and publishes `SelectionCleared`; `false` when
    /// nothing was selected.
    pub fn clear_selection(&mut self) -> bool {
        if self.selected.take().is_some() {
            self.sink.publish(SceneEvent::SelectionCleared);
            true
        } else {
            false
        }
    }

    pub fn click_at(&mut self, camera: &Camera, x: f64, y: f64) -> PickOutcome {
        let ray = self.screen_ray(camera, x, y);
        self.click_ray(ray)
    }

    // ─── Pointer tracking ────────────────────────────────────────────────

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.press = Some(Press { x, y, dragged: false });
    }

    /// Tracks drag distance of a pressed pointer and updates the hover.
    pub fn pointer_move(&mut self, camera: &Camera, x: f64, y: f64) -> Option<HoverChange> {
        self.track(x, y);
        self.hover_at(camera, x, y)
    }

    /// Resolves a click unless the press turned into a drag. `None` when no
    /// click was resolved.
    pub fn pointer_up(&mut self, camera: &Camera, x: f64, y: f64) -> Option<PickOutcome> {
        self.track(x, y);
        let press = self.press.take()?;
        if press.dragged {
            return None;
        }
        Some(self.click_at(camera, x, y))
    }

    fn track(&mut self, x: f64, y: f64) {
        let threshold = self.drag_threshold;
        if let Some(press) = self.press.as_mut() {
            if (x - press.x).abs() > threshold || (y - press.y).abs() > threshold {
                press.dragged = true;
            }
        }
    }
}

fn check_viewport(viewport: Viewport) -> Result<(), PickingError> {
    if viewport.is_valid() {
        Ok(())
    } else {
        Err(PickingError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::CameraConfig;
    use crate::geom::{Vec3, uv_sphere};
    use crate::interaction::RecordingSink;
    use crate::scene::{Geometry, NodeRole, NodeTransform, SceneNode, Subject};

    fn node(scene: &mut Scene, id: &str, position: Point3) -> NodeId {
        let subject = Subject {
            id: id.to_string(),
            name: id.to_string(),
            area: "web".to_string(),
            ..Subject::default()
        };
        scene.add(
            SceneNode::new(id, NodeRole::Root { subject }, Geometry::Mesh(Arc::new(uv_sphere(0.5, 12, 8))))
                .with_transform(NodeTransform::at(position))
                .with_area("web"),
        )
    }

    fn setup() -> (PickingService, RecordingSink, Scene, NodeId, NodeId) {
        let mut scene = Scene::new();
        let a = node(&mut scene, "A", Point3::new(0.0, 0.0, 0.0));
        let b = node(&mut scene, "B", Point3::new(3.0, 0.0, 0.0));
        let sink = RecordingSink::new();
        let mut picking = PickingService::new(Viewport::new(800.0, 600.0), Rc::new(sink.clone())).unwrap();
        picking.sync_targets(&scene);
        (picking, sink, scene, a, b)
    }

    fn ray_at(x: f64) -> Option<Ray3> {
        Ray3::new(Point3::new(x, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn invalid_viewport_is_an_error() {
        let sink: Rc<dyn EventSink> = Rc::new(RecordingSink::new());
        let err = PickingService::new(Viewport::new(0.0, 600.0), sink).unwrap_err();
        assert_eq!(err, PickingError::InvalidViewport { width: 0.0, height: 600.0 });
    }

    #[test]
    fn nearest_hit_wins() {
        let (mut picking, _, mut scene, a, _) = setup();
        let behind = node(&mut scene, "C", Point3::new(0.0, 0.0, -4.0));
        picking.sync_targets(&scene);
        match picking.pick_ray(ray_at(0.0).unwrap()) {
            PickOutcome::Hit { node, distance } => {
                assert_eq!(node, a);
                assert_ne!(node, behind);
                assert!((distance - 9.5).abs() < 1e-3);
            }
            PickOutcome::Miss => panic!("expected a hit"),
        }
        assert_eq!(picking.pick_ray(ray_at(20.0).unwrap()), PickOutcome::Miss);
    }

    #[test]
    fn unhover_comes_before_hover() {
        let (mut picking, sink, _, a, b) = setup();
        picking.hover_ray(ray_at(0.0));
        assert!(picking.hover_ray(ray_at(0.1)).is_none(), "same node, no event");
        let change = picking.hover_ray(ray_at(3.0)).unwrap();
        assert_eq!(change, HoverChange { previous: Some(a), current: Some(b) });
        picking.hover_ray(ray_at(20.0));

        assert_eq!(
            sink.drain(),
            vec![
                SceneEvent::Hover { node: a, entity_id: "A".to_string() },
                SceneEvent::Unhover { node: a },
                SceneEvent::Hover { node: b, entity_id: "B".to_string() },
                SceneEvent::Unhover { node: b },
            ]
        );
        assert!(picking.hovered().is_none());
    }

    #[test]
    fn click_selects_and_miss_clears_once() {
        let (mut picking, sink, _, a, _) = setup();
        picking.click_ray(ray_at(20.0));
        assert!(sink.is_empty(), "nothing selected, nothing cleared");

        picking.click_ray(ray_at(0.0));
        assert_eq!(picking.selected(), Some(a));
        picking.click_ray(ray_at(20.0));
        picking.click_ray(ray_at(20.0));
        assert_eq!(
            sink.drain(),
            vec![
                SceneEvent::ClickResolved { node: a, entity_id: "A".to_string() },
                SceneEvent::SelectionCleared,
            ]
        );
    }

    #[test]
    fn hidden_nodes_are_not_targets() {
        let (mut picking, _, mut scene, _, _) = setup();
        scene.filter_by_area("ia");
        picking.sync_targets(&scene);
        assert_eq!(picking.target_count(), 0);
        assert_eq!(picking.pick_ray(ray_at(0.0).unwrap()), PickOutcome::Miss);
    }

    #[test]
    fn drags_beyond_the_threshold_do_not_click() {
        let (mut picking, sink, _, a, _) = setup();
        let mut camera = Camera::from_config(&CameraConfig::default(), 800.0 / 600.0);
        camera.position = Point3::new(0.0, 0.0, 10.0);
        camera.target = Point3::ORIGIN;

        picking.pointer_down(400.0, 300.0);
        picking.pointer_move(&camera, 407.0, 300.0);
        assert_eq!(picking.pointer_up(&camera, 400.0, 300.0), None, "moved 7 px then back");

        picking.pointer_down(400.0, 300.0);
        picking.pointer_move(&camera, 402.0, 301.0);
        let outcome = picking.pointer_up(&camera, 400.0, 300.0).unwrap();
        assert_eq!(outcome.node(), Some(a));

        picking.pointer_down(400.0, 300.0);
        assert_eq!(picking.pointer_up(&camera, 400.0, 310.0), None, "checked at release too");

        let clicks = sink
            .drain()
            .into_iter()
            .filter(|e| matches!(e, SceneEvent::ClickResolved { .. }))
            .count();
        assert_eq!(clicks, 1);
    }

    #[test]
    fn seven_pixel_release_is_a_drag_and_two_pixels_is_a_click() {
        let (mut picking, _, _, _, _) = setup();
        let camera = Camera::from_config(&CameraConfig::default(), 800.0 / 600.0);

        picking.pointer_down(100.0, 100.0);
        assert_eq!(picking.pointer_up(&camera, 107.0, 100.0), None);

        picking.pointer_down(100.0, 100.0);
        assert!(picking.pointer_up(&camera, 102.0, 100.0).is_some());

        picking.pointer_down(100.0, 100.0);
        assert!(picking.pointer_up(&camera, 105.0, 95.0).is_some(), "5 px is within the threshold");
    }

    #[test]
    fn clear_selection_publishes_only_when_selected() {
        let (mut picking, sink, _, a, _) = setup();
        assert!(!picking.clear_selection());
        assert!(sink.is_empty());

        picking.click_ray(ray_at(0.0));
        assert_eq!(picking.selected(), Some(a));
        assert!(picking.clear_selection());
        assert!(picking.selected().is_none());
        assert_eq!(sink.drain().last(), Some(&SceneEvent::SelectionCleared));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let (mut picking, _, _, _, _) = setup();
        let camera = Camera::from_config(&CameraConfig::default(), 1.0);
        assert_eq!(picking.pointer_up(&camera, 10.0, 10.0), None);
    }
}
