//! Trunk spine, its rings and the core subject nodes spiralling around it.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;

use crate::config::{AnimationConfig, AreaPalette, NodeConfig, NodeRingConfig, TrunkConfig};
use crate::geom::{
    CatmullRom3, Curve3, CurveSpec, GeomMesh, Point3, RadiusProfile, Transform, TubeOptions,
    feature_edges, flat_ring, sweep_tube, uv_sphere,
};

use super::assembler::{BuildIssue, Stage, StageReport};
use super::catalog::{Subject, validate_subject};
use super::decorate::RingDecorator;
use super::material::{MaterialFactory, MaterialKind};
use super::node::{
    AnimationSpec, DecorationKind, Geometry, NodeId, NodeRole, NodeTransform, Scene, SceneNode,
};

const RING_SEGMENTS: usize = 24;
const TRUNK_EDGE_THRESHOLD_DEG: f64 = 40.0;
/// Mixed into the tree seed for the spine jitter.
const SPINE_SEED: u64 = 0x7472_756e;

/// What later stages need from the trunk.
#[derive(Debug, Clone, PartialEq)]
pub struct TrunkOutput {
    /// Top of the spine, where branches leave the trunk.
    pub canopy: Point3,
    pub spine: Option<CatmullRom3>,
}

/// Subject sphere with two flat halo rings, used for trunk subjects.
#[derive(Debug, Clone)]
pub struct SubjectNodeBuilder {
    sphere: Arc<GeomMesh>,
    inner: (Arc<GeomMesh>, f64),
    outer: (Arc<GeomMesh>, f64),
    ring_spin: f64,
}

impl SubjectNodeBuilder {
    #[must_use]
    pub fn new(config: &NodeConfig, ring_spin: f64) -> Self {
        let ring = |cfg: &NodeRingConfig| {
            (
                Arc::new(flat_ring(cfg.inner_radius, cfg.outer_radius, RING_SEGMENTS)),
                cfg.opacity,
            )
        };
        Self {
            sphere: Arc::new(uv_sphere(config.radius, config.segments, config.segments)),
            inner: ring(&config.inner_ring),
            outer: ring(&config.outer_ring),
            ring_spin,
        }
    }

    /// Adds the node and its rings; returns the node id.
    pub fn add(
        &self,
        role: NodeRole,
        subject: &Subject,
        animation: AnimationSpec,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
    ) -> NodeId {
        let position = animation.rest_position;
        let id = scene.add(
            SceneNode::new(subject.id.clone(), role, Geometry::Mesh(Arc::clone(&self.sphere)))
                .with_material(materials.material(&subject.area, MaterialKind::Node))
                .with_transform(NodeTransform::at(position))
                .with_animation(animation)
                .with_area(subject.area.clone()),
        );

        // Rings lie flat around the node and turn in their own plane.
        let flat = Transform::rotate_x(FRAC_PI_2);
        for (name, (mesh, opacity)) in [("inner", &self.inner), ("outer", &self.outer)] {
            scene.add_child(
                id,
                SceneNode::new(
                    format!("{}-{name}-ring", subject.id),
                    NodeRole::Decoration(DecorationKind::Ring),
                    Geometry::Mesh(Arc::clone(mesh)),
                )
                .with_material(materials.material(&subject.area, MaterialKind::Ring).with_opacity(*opacity))
                .with_transform(NodeTransform::default().with_orientation(flat))
                .with_animation(AnimationSpec::spinning(Point3::ORIGIN, self.ring_spin)),
            );
        }
        id
    }
}

pub struct TrunkBuilder<'a> {
    config: &'a TrunkConfig,
    nodes: &'a NodeConfig,
    animation: &'a AnimationConfig,
    seed: u64,
}

impl<'a> TrunkBuilder<'a> {
    #[must_use]
    pub fn new(
        config: &'a TrunkConfig,
        nodes: &'a NodeConfig,
        animation: &'a AnimationConfig,
        seed: u64,
    ) -> Self {
        Self {
            config,
            nodes,
            animation,
            seed,
        }
    }

    /// Vertical spine from the base to the canopy with jittered interior points.
    #[must_use]
    pub fn spine_spec(&self) -> CurveSpec {
        let cfg = self.config;
        let interior = cfg.spine_points;
        let points = (0..=interior + 1)
            .map(|i| {
                let t = i as f64 / (interior + 1) as f64;
                Point3::new(0.0, cfg.base_y + cfg.height * t, 0.0)
            })
            .collect();
        CurveSpec::new(points, cfg.spine_tension).jittered(self.seed ^ SPINE_SEED, cfg.spine_jitter)
    }

    /// Position of trunk subject `index` of `total`: around the spine, climbing by `node_spacing`.
    #[must_use]
    pub fn node_position(&self, spine: &impl Curve3, index: usize, total: usize) -> Point3 {
        let cfg = self.config;
        let angle = index as f64 / total.max(1) as f64 * TAU;
        let y = cfg.node_start_y + index as f64 * cfg.node_spacing;
        let t = if cfg.height > 0.0 {
            ((y - cfg.base_y) / cfg.height).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let axis = spine.point_at(t);
        Point3::new(
            axis.x + angle.cos() * cfg.node_radius,
            y,
            axis.z + angle.sin() * cfg.node_radius,
        )
    }

    pub fn build(
        &self,
        trunk: &[Subject],
        first_index: usize,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
    ) -> (StageReport, TrunkOutput) {
        let mut report = StageReport::new(Stage::Trunk);
        let cfg = self.config;
        let fallback_canopy = Point3::new(0.0, cfg.canopy_y(), 0.0);

        let spine = match self.spine_spec().build() {
            Ok(spine) => Some(spine),
            Err(err) => {
                report.issue(BuildIssue::from_curve(Stage::Trunk, "trunk", &err));
                None
            }
        };
        if let Some(spine) = &spine {
            self.add_structure(spine, scene, materials, &mut report);
        }

        let node_builder = SubjectNodeBuilder::new(self.nodes, self.animation.ring_spin);
        let straight = CatmullRom3::new(vec![Point3::new(0.0, cfg.base_y, 0.0), fallback_canopy], 0.5);
        for (i, subject) in trunk.iter().enumerate() {
            report.attempted += 1;
            if let Err(err) = validate_subject(subject) {
                report.skip(i, &err);
                continue;
            }

            let position = match (&spine, &straight) {
                (Some(spine), _) => self.node_position(spine, i, trunk.len()),
                (None, Ok(line)) => self.node_position(line, i, trunk.len()),
                (None, Err(_)) => fallback_canopy,
            };
            let index = first_index + report.built;
            let role = NodeRole::TrunkSegment {
                subject: subject.clone(),
                index: i,
            };
            let animation = AnimationSpec::for_subject(self.animation, index, position);
            let id = node_builder.add(role, subject, animation, scene, materials);
            report.record_built(id);
        }

        let canopy = spine
            .as_ref()
            .map_or(fallback_canopy, |spine| spine.point_at(1.0));
        (report, TrunkOutput { canopy, spine })
    }

    fn add_structure(
        &self,
        spine: &CatmullRom3,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
        report: &mut StageReport,
    ) {
        let cfg = self.config;
        let area = AreaPalette::FALLBACK_AREA;
        let profile = RadiusProfile::Linear {
            start: cfg.radius_bottom,
            end: cfg.radius_top,
        };

        match sweep_tube(spine, profile, TubeOptions::new(cfg.tubular_segments, cfg.radial_segments)) {
            Ok(tube) => {
                let edges = feature_edges(&tube.mesh, TRUNK_EDGE_THRESHOLD_DEG);
                let mesh = Arc::new(tube.mesh);
                let id = scene.add(
                    SceneNode::new(
                        "trunk",
                        NodeRole::Decoration(DecorationKind::Structure),
                        Geometry::Mesh(Arc::clone(&mesh)),
                    )
                    .with_material(materials.material(area, MaterialKind::Tube).with_opacity(cfg.opacity)),
                );
                scene.add_child(
                    id,
                    SceneNode::new(
                        "trunk-edges",
                        NodeRole::Decoration(DecorationKind::Edges),
                        Geometry::Edges {
                            mesh,
                            overlay: Arc::new(edges),
                        },
                    )
                    .with_material(materials.material(area, MaterialKind::Edges)),
                );
            }
            Err(err) => report.issue(BuildIssue::from_tube(Stage::Trunk, "trunk", &err)),
        }

        let color = materials.color_for(area);
        let ring_material = materials.material(area, MaterialKind::Ring);
        for (i, ring) in RingDecorator::from(&cfg.rings).decorate(spine, color).into_iter().enumerate() {
            scene.add(ring.into_node(format!("trunk-ring-{i}"), ring_material.clone()));
        }
    }
}
