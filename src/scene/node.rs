//! Scene graph nodes stored in a flat arena.
//!
//! Nodes are created once by the assembler and addressed by [`NodeId`]. Parent
//! links give world transforms and visibility inheritance; there is no removal
//! short of [`Scene::clear`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::config::AnimationConfig;
use crate::geom::{EdgeOverlay, GeomMesh, LineStrip, Point3, Transform};

use super::catalog::{ClusterInfo, Satellite, Subject};
use super::label::LabelBitmap;
use super::material::{MaterialRestore, SurfaceMaterial};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd, Serialize)]
pub struct NodeId(pub usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

// ─── Roles ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecorationKind {
    /// Trunk spine, branch and root tubes, cluster groups.
    Structure,
    Shell,
    Ring,
    Particle,
    Connector,
    Label,
    Edges,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeRole {
    Root { subject: Subject },
    TrunkSegment { subject: Subject, index: usize },
    ClusterCentral { cluster: ClusterInfo },
    ClusterSatellite { satellite: Satellite, index: usize },
    Decoration(DecorationKind),
}

impl NodeRole {
    /// The content record behind an interactive node; `None` for decorations.
    #[must_use]
    pub fn content(&self) -> Option<ContentRef<'_>> {
        match self {
            Self::Root { subject } | Self::TrunkSegment { subject, .. } => {
                Some(ContentRef::Subject(subject))
            }
            Self::ClusterCentral { cluster } => Some(ContentRef::Cluster(cluster)),
            Self::ClusterSatellite { satellite, .. } => Some(ContentRef::Satellite(satellite)),
            Self::Decoration(_) => None,
        }
    }

    #[must_use]
    pub fn is_interactive(&self) -> bool {
        !matches!(self, Self::Decoration(_))
    }

    #[must_use]
    pub fn decoration(&self) -> Option<DecorationKind> {
        match self {
            Self::Decoration(kind) => Some(*kind),
            _ => None,
        }
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Root { .. } => "root",
            Self::TrunkSegment { .. } => "trunk-segment",
            Self::ClusterCentral { .. } => "cluster-central",
            Self::ClusterSatellite { .. } => "cluster-satellite",
            Self::Decoration(_) => "decoration",
        }
    }
}

/// Borrowed content record of an interactive node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentRef<'a> {
    Subject(&'a Subject),
    Satellite(&'a Satellite),
    Cluster(&'a ClusterInfo),
}

impl<'a> ContentRef<'a> {
    #[must_use]
    pub fn entity_id(&self) -> &'a str {
        match *self {
            Self::Subject(subject) => &subject.id,
            Self::Satellite(satellite) => &satellite.id,
            Self::Cluster(cluster) => &cluster.id,
        }
    }

    #[must_use]
    pub fn area(&self) -> &'a str {
        match *self {
            Self::Subject(subject) => &subject.area,
            Self::Satellite(satellite) => &satellite.area,
            Self::Cluster(cluster) => &cluster.area,
        }
    }
}

// ─── Geometry, transform, animation ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Transform-only node grouping its children.
    Group,
    Mesh(Arc<GeomMesh>),
    /// Outline drawn over the vertex buffer of `mesh`.
    Edges {
        mesh: Arc<GeomMesh>,
        overlay: Arc<EdgeOverlay>,
    },
    Lines(LineStrip),
    Label(Box<LabelBitmap>),
}

impl Geometry {
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Mesh(_) => "mesh",
            Self::Edges { .. } => "edges",
            Self::Lines(_) => "lines",
            Self::Label(_) => "label",
        }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        match self {
            Self::Mesh(mesh) => mesh.triangle_count(),
            _ => 0,
        }
    }

    /// Radius of a sphere around the local origin enclosing the geometry.
    #[must_use]
    pub fn local_radius(&self) -> f64 {
        match self {
            Self::Group => 0.0,
            Self::Mesh(mesh) | Self::Edges { mesh, .. } => mesh.radius_about(Point3::ORIGIN),
            Self::Lines(lines) => lines
                .points
                .iter()
                .map(|p| Point3::from_array(*p).to_vec3().length())
                .fold(0.0, f64::max),
            Self::Label(label) => 0.5 * label.quad_size[0].hypot(label.quad_size[1]),
        }
    }
}

/// Local placement: `translate(position) * orientation * rot_z(spin) * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub position: Point3,
    pub orientation: Transform,
    /// Accumulated rotation about the local Z axis.
    pub spin: f64,
    pub scale: f64,
}

impl NodeTransform {
    #[must_use]
    pub fn at(position: Point3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_orientation(mut self, orientation: Transform) -> Self {
        self.orientation = orientation;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn matrix(&self) -> Transform {
        Transform::translate(self.position.to_vec3())
            * self.orientation
            * Transform::rotate_z(self.spin)
            * Transform::uniform_scale(self.scale)
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            position: Point3::ORIGIN,
            orientation: Transform::identity(),
            spin: 0.0,
            scale: 1.0,
        }
    }
}

/// `amplitude * sin(frequency * t + phase)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Oscillation {
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,
}

/// Emissive intensity oscillating around `base`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Glow {
    pub base: f64,
    pub amplitude: f64,
    pub frequency: f64,
}

/// Per-node animation parameters. The driver reads these and writes the transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSpec {
    pub pulse: Option<Oscillation>,
    pub float: Option<Oscillation>,
    /// Radians per 1/60 s around local Z.
    pub spin_speed: f64,
    pub glow: Option<Glow>,
    pub rest_position: Point3,
}

impl AnimationSpec {
    #[must_use]
    pub fn at_rest(rest_position: Point3) -> Self {
        Self {
            pulse: None,
            float: None,
            spin_speed: 0.0,
            glow: None,
            rest_position,
        }
    }

    #[must_use]
    pub fn spinning(rest_position: Point3, spin_speed: f64) -> Self {
        Self {
            spin_speed,
            ..Self::at_rest(rest_position)
        }
    }

    #[must_use]
    pub fn with_pulse(mut self, pulse: Oscillation) -> Self {
        self.pulse = Some(pulse);
        self
    }

    #[must_use]
    pub fn with_float(mut self, float: Oscillation) -> Self {
        self.float = Some(float);
        self
    }

    #[must_use]
    pub fn with_glow(mut self, glow: Glow) -> Self {
        self.glow = Some(glow);
        self
    }

    /// Pulse, float and glow of root and trunk subject nodes. `index` staggers
    /// the phases so neighbours do not move in lockstep.
    #[must_use]
    pub fn for_subject(config: &AnimationConfig, index: usize, rest_position: Point3) -> Self {
        let index = index as f64;
        Self::at_rest(rest_position)
            .with_pulse(Oscillation {
                amplitude: config.pulse_amount,
                frequency: config.pulse_speed,
                phase: index * config.phase_step,
            })
            .with_float(Oscillation {
                amplitude: config.float_amount,
                frequency: config.float_speed,
                phase: index,
            })
            .with_glow(Glow {
                base: config.glow_base,
                amplitude: config.glow_amount,
                frequency: config.glow_speed,
            })
    }
}

// ─── Node ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub role: NodeRole,
    pub geometry: Geometry,
    pub material: Option<SurfaceMaterial>,
    pub transform: NodeTransform,
    pub animation: Option<AnimationSpec>,
    pub visible: bool,
    /// Knowledge area used by area filtering.
    pub area: Option<String>,
    /// Interactive node whose visibility this decoration follows when it is
    /// not a descendant (labels and connectors).
    pub owner: Option<NodeId>,
    /// Local bounding radius before scaling.
    pub bounding_radius: f64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    highlight: Option<MaterialRestore>,
}

impl SceneNode {
    #[must_use]
    pub fn new(name: impl Into<String>, role: NodeRole, geometry: Geometry) -> Self {
        let bounding_radius = geometry.local_radius();
        Self {
            name: name.into(),
            role,
            geometry,
            material: None,
            transform: NodeTransform::default(),
            animation: None,
            visible: true,
            area: None,
            owner: None,
            bounding_radius,
            parent: None,
            children: Vec::new(),
            highlight: None,
        }
    }

    #[must_use]
    pub fn group(name: impl Into<String>, position: Point3) -> Self {
        Self::new(name, NodeRole::Decoration(DecorationKind::Structure), Geometry::Group)
            .with_transform(NodeTransform::at(position))
    }

    #[must_use]
    pub fn with_material(mut self, material: SurfaceMaterial) -> Self {
        self.material = Some(material);
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_animation(mut self, animation: AnimationSpec) -> Self {
        self.animation = Some(animation);
        self
    }

    #[must_use]
    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: NodeId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.highlight.is_some()
    }

    /// Entity id of the content record, for interactive nodes.
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.role.content().map(|content| content.entity_id())
    }
}

// ─── Scene ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneStats {
    pub total_nodes: usize,
    pub interactive: usize,
    pub roots: usize,
    pub trunk: usize,
    pub clusters: usize,
    pub satellites: usize,
    pub decorations: usize,
    pub visible_interactive: usize,
    pub triangles: usize,
    /// Interactive nodes per knowledge area.
    pub areas: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a top-level node.
    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Adds `node` under `parent`. An unknown parent makes it top-level.
    pub fn add_child(&mut self, parent: NodeId, mut node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        if let Some(parent_node) = self.nodes.get_mut(parent.0) {
            parent_node.children.push(id);
            node.parent = Some(parent);
        }
        self.nodes.push(node);
        id
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut SceneNode)> {
        self.nodes
            .iter_mut()
            .enumerate()
            .map(|(i, node)| (NodeId(i), node))
    }

    #[must_use]
    pub fn world_transform(&self, id: NodeId) -> Transform {
        let mut matrix = Transform::identity();
        let mut current = self.get(id);
        while let Some(node) = current {
            matrix = node.transform.matrix() * matrix;
            current = node.parent.and_then(|parent| self.get(parent));
        }
        matrix
    }

    #[must_use]
    pub fn world_position(&self, id: NodeId) -> Point3 {
        self.world_transform(id).apply_point(Point3::ORIGIN)
    }

    /// World-space bounding sphere, `None` for unknown ids or empty geometry.
    #[must_use]
    pub fn world_bounds(&self, id: NodeId) -> Option<(Point3, f64)> {
        let node = self.get(id)?;
        if node.bounding_radius <= 0.0 {
            return None;
        }
        let world = self.world_transform(id);
        Some((
            world.apply_point(Point3::ORIGIN),
            node.bounding_radius * world.max_scale(),
        ))
    }

    /// True when the node, its ancestors and its owner are all visible.
    #[must_use]
    pub fn is_visible_in_world(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.get(node_id) else {
                return false;
            };
            if !node.visible {
                return false;
            }
            if let Some(owner) = node.owner {
                if owner != node_id && !self.is_visible_in_world(owner) {
                    return false;
                }
            }
            current = node.parent;
        }
        true
    }

    #[must_use]
    pub fn interactive_nodes(&self) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.role.is_interactive())
            .map(|(id, _)| id)
            .collect()
    }

    #[must_use]
    pub fn find_by_entity_id(&self, entity_id: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.entity_id() == Some(entity_id))
            .map(|(id, _)| id)
    }

    /// Shows interactive nodes of `area` and hides the others; `"all"` shows
    /// everything. Returns the number of interactive nodes left visible.
    pub fn filter_by_area(&mut self, area: &str) -> usize {
        let show_all = area == "all";
        let mut visible = 0;
        for node in self.nodes.iter_mut().filter(|node| node.role.is_interactive()) {
            node.visible = show_all || node.area.as_deref() == Some(area);
            if node.visible {
                visible += 1;
            }
        }
        visible
    }

    pub fn show_all(&mut self) -> usize {
        self.filter_by_area("all")
    }

    /// Raises the node's emissive intensity and its child decorations' opacity,
    /// saving the base values. Already highlighted nodes are left as they are.
    pub fn set_highlight(&mut self, id: NodeId, emissive_intensity: f64, decoration_opacity: f64) -> bool {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };
        if node.highlight.is_some() {
            return false;
        }
        if let Some(material) = node.material.as_mut() {
            node.highlight = Some(material.snapshot());
            material.emissive_intensity = emissive_intensity;
        }
        let children = node.children.clone();
        for child in children {
            if let Some(child) = self.nodes.get_mut(child.0) {
                if child.highlight.is_none() {
                    if let Some(material) = child.material.as_mut() {
                        child.highlight = Some(material.snapshot());
                        material.opacity = decoration_opacity;
                    }
                }
            }
        }
        true
    }

    /// Restores the values saved by [`Scene::set_highlight`].
    pub fn clear_highlight(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return false;
        };
        let Some(saved) = node.highlight.take() else {
            return false;
        };
        if let Some(material) = node.material.as_mut() {
            material.restore(saved);
        }
        let children = node.children.clone();
        for child in children {
            if let Some(child) = self.nodes.get_mut(child.0) {
                if let (Some(saved), Some(material)) = (child.highlight.take(), child.material.as_mut()) {
                    material.restore(saved);
                }
            }
        }
        true
    }

    #[must_use]
    pub fn stats(&self) -> SceneStats {
        let mut stats = SceneStats {
            total_nodes: self.nodes.len(),
            ..SceneStats::default()
        };
        for (id, node) in self.iter() {
            stats.triangles += node.geometry.triangle_count();
            match &node.role {
                NodeRole::Root { .. } => stats.roots += 1,
                NodeRole::TrunkSegment { .. } => stats.trunk += 1,
                NodeRole::ClusterCentral { .. } => stats.clusters += 1,
                NodeRole::ClusterSatellite { .. } => stats.satellites += 1,
                NodeRole::Decoration(_) => {
                    stats.decorations += 1;
                    continue;
                }
            }
            stats.interactive += 1;
            if self.is_visible_in_world(id) {
                stats.visible_interactive += 1;
            }
            if let Some(area) = &node.area {
                *stats.areas.entry(area.clone()).or_insert(0) += 1;
            }
        }
        stats
    }

    /// Releases every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::uv_sphere;
    use crate::scene::material::{Color, MaterialKind};

    fn subject(id: &str, area: &str) -> Subject {
        Subject {
            id: id.to_string(),
            name: format!("Subject {id}"),
            area: area.to_string(),
            ..Subject::default()
        }
    }

    fn node_with_ring(scene: &mut Scene, id: &str, area: &str, position: Point3) -> (NodeId, NodeId) {
        let sphere = Arc::new(uv_sphere(0.25, 8, 6));
        let node = scene.add(
            SceneNode::new(
                id,
                NodeRole::Root { subject: subject(id, area) },
                Geometry::Mesh(sphere.clone()),
            )
            .with_material(SurfaceMaterial::new(MaterialKind::Node, Color::WHITE))
            .with_transform(NodeTransform::at(position))
            .with_area(area),
        );
        let ring = scene.add_child(
            node,
            SceneNode::new("ring", NodeRole::Decoration(DecorationKind::Ring), Geometry::Mesh(sphere))
                .with_material(SurfaceMaterial::new(MaterialKind::Ring, Color::WHITE)),
        );
        (node, ring)
    }

    #[test]
    fn only_interactive_roles_carry_content() {
        let role = NodeRole::Root { subject: subject("INF-110", "fundamentos") };
        assert_eq!(role.content().map(|c| c.entity_id()), Some("INF-110"));
        assert!(role.is_interactive());
        let deco = NodeRole::Decoration(DecorationKind::Label);
        assert!(deco.content().is_none());
        assert!(!deco.is_interactive());
    }

    #[test]
    fn world_transform_composes_parents() {
        let mut scene = Scene::new();
        let group = scene.add(SceneNode::group("cluster", Point3::new(6.0, 10.0, 0.0)));
        let child = scene.add_child(
            group,
            SceneNode::group("satellite", Point3::new(2.5, 0.0, 0.0)),
        );
        assert_eq!(scene.world_position(child), Point3::new(8.5, 10.0, 0.0));
        assert_eq!(scene.get(child).and_then(SceneNode::parent), Some(group));
        assert_eq!(scene.get(group).map(|n| n.children().len()), Some(1));
    }

    #[test]
    fn world_bounds_follow_scale() {
        let mut scene = Scene::new();
        let (node, _) = node_with_ring(&mut scene, "A", "web", Point3::new(1.0, 2.0, 3.0));
        scene.get_mut(node).unwrap().transform.scale = 2.0;
        let (center, radius) = scene.world_bounds(node).unwrap();
        assert_eq!(center, Point3::new(1.0, 2.0, 3.0));
        assert!((radius - 0.5).abs() < 1e-9);
    }

    #[test]
    fn area_filter_hides_other_areas_and_their_decorations() {
        let mut scene = Scene::new();
        let (web, web_ring) = node_with_ring(&mut scene, "A", "web", Point3::ORIGIN);
        let (ia, ia_ring) = node_with_ring(&mut scene, "B", "ia", Point3::ORIGIN);
        let label = scene.add(
            SceneNode::new("label", NodeRole::Decoration(DecorationKind::Label), Geometry::Group)
                .with_owner(ia),
        );

        assert_eq!(scene.filter_by_area("web"), 1);
        assert!(scene.is_visible_in_world(web_ring));
        assert!(!scene.is_visible_in_world(ia));
        assert!(!scene.is_visible_in_world(ia_ring));
        assert!(!scene.is_visible_in_world(label));
        assert_eq!(scene.stats().visible_interactive, 1);

        assert_eq!(scene.show_all(), 2);
        assert!(scene.is_visible_in_world(label));
        assert!(scene.is_visible_in_world(web));
    }

    #[test]
    fn highlight_saves_and_restores_materials() {
        let mut scene = Scene::new();
        let (node, ring) = node_with_ring(&mut scene, "A", "web", Point3::ORIGIN);

        assert!(scene.set_highlight(node, 1.5, 0.8));
        assert!(!scene.set_highlight(node, 1.5, 0.8), "second highlight is a no-op");
        let n = scene.get(node).unwrap();
        assert!(n.is_highlighted());
        assert_eq!(n.material.as_ref().unwrap().emissive_intensity, 1.5);
        assert_eq!(scene.get(ring).unwrap().material.as_ref().unwrap().opacity, 0.8);

        assert!(scene.clear_highlight(node));
        assert!(!scene.clear_highlight(node));
        assert_eq!(scene.get(node).unwrap().material.as_ref().unwrap().emissive_intensity, 1.0);
        assert_eq!(scene.get(ring).unwrap().material.as_ref().unwrap().opacity, 0.3);
    }

    #[test]
    fn stats_and_lookup() {
        let mut scene = Scene::new();
        node_with_ring(&mut scene, "A", "web", Point3::ORIGIN);
        let (b, _) = node_with_ring(&mut scene, "B", "web", Point3::ORIGIN);
        let stats = scene.stats();
        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.interactive, 2);
        assert_eq!(stats.decorations, 2);
        assert_eq!(stats.areas.get("web"), Some(&2));
        assert_eq!(scene.find_by_entity_id("B"), Some(b));
        assert_eq!(scene.interactive_nodes().len(), 2);

        scene.clear();
        assert!(scene.is_empty());
    }
}
