//! Root stems around the trunk base and the tapered tubes feeding into it.

use std::f64::consts::TAU;
use std::sync::Arc;

use crate::config::{AnimationConfig, RootsConfig};
use crate::geom::{
    CubicBezier3, EdgeOverlay, GeomMesh, Point3, RadiusProfile, TubeError, TubeMesh, TubeOptions,
    Vec3, feature_edges, frustum, sweep_tube,
};

use super::assembler::{BuildIssue, Stage, StageReport};
use super::catalog::{Subject, validate_subject};
use super::material::{Blending, MaterialFactory, MaterialKind};
use super::node::{
    AnimationSpec, DecorationKind, Geometry, NodeId, NodeRole, NodeTransform, Scene, SceneNode,
};

/// Dihedral angle above which stem edges are outlined.
const STEM_EDGE_THRESHOLD_DEG: f64 = 30.0;
const STEM_EDGE_OPACITY: f64 = 0.7;
const HALO_OPACITY: f64 = 0.3;

pub struct RootsBuilder<'a> {
    config: &'a RootsConfig,
    animation: &'a AnimationConfig,
}

impl<'a> RootsBuilder<'a> {
    #[must_use]
    pub fn new(config: &'a RootsConfig, animation: &'a AnimationConfig) -> Self {
        Self { config, animation }
    }

    /// Stem position of root `index` out of `total`.
    #[must_use]
    pub fn stem_position(&self, index: usize, total: usize) -> Point3 {
        let angle = index as f64 / total.max(1) as f64 * TAU;
        Point3::new(
            angle.cos() * self.config.circle_radius,
            self.config.stem_y,
            angle.sin() * self.config.circle_radius,
        )
    }

    /// S-curves from the foot of a stem to points around the trunk base.
    #[must_use]
    pub fn connection_curves(&self, stem: Point3) -> Vec<CubicBezier3> {
        let cfg = self.config;
        let count = cfg.connections_per_root;
        let start = Point3::new(stem.x, cfg.connection_start_y, stem.z);
        let target = Point3::from_array(cfg.connection_target);
        let lift = Vec3::new(0.0, cfg.connection_curve_height, cfg.connection_curve_depth);
        let settle = Vec3::new(
            0.0,
            -cfg.connection_curve_height * 0.5,
            -cfg.connection_curve_depth,
        );

        (0..count)
            .map(|k| {
                let angle = k as f64 / count as f64 * TAU;
                let end = target.add_vec(Vec3::new(angle.cos(), 0.0, angle.sin()) * cfg.connection_spread);
                CubicBezier3::new(start, start.add_vec(lift), end.add_vec(settle), end)
            })
            .collect()
    }

    pub fn connection_tube(&self, curve: &CubicBezier3) -> Result<TubeMesh, TubeError> {
        let cfg = self.config;
        sweep_tube(
            curve,
            RadiusProfile::Taper {
                start: cfg.connection_radius_start,
                end: cfg.connection_radius_end,
                exponent: cfg.connection_taper_exponent,
            },
            TubeOptions::new(cfg.connection_segments, cfg.connection_radial_segments),
        )
    }

    /// Adds one stem per valid subject. `first_index` staggers animation phases
    /// across the whole tree.
    pub fn build(
        &self,
        roots: &[Subject],
        first_index: usize,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
    ) -> StageReport {
        let mut report = StageReport::new(Stage::Roots);
        let cfg = self.config;
        let stem_mesh = Arc::new(frustum(
            cfg.stem_radius_top,
            cfg.stem_radius_bottom,
            cfg.stem_height,
            cfg.stem_segments,
        ));
        let stem_edges = Arc::new(feature_edges(&stem_mesh, STEM_EDGE_THRESHOLD_DEG));

        for (i, subject) in roots.iter().enumerate() {
            report.attempted += 1;
            if let Err(err) = validate_subject(subject) {
                report.skip(i, &err);
                continue;
            }

            let position = self.stem_position(i, roots.len());
            let index = first_index + report.built;
            let id = self.add_stem(subject, index, position, &stem_mesh, &stem_edges, scene, materials);
            report.record_built(id);

            for (k, curve) in self.connection_curves(position).iter().enumerate() {
                match self.connection_tube(curve) {
                    Ok(tube) => {
                        let material = materials
                            .material(&subject.area, MaterialKind::Line)
                            .with_opacity(cfg.connection_opacity)
                            .with_blending(Blending::Additive);
                        scene.add(
                            SceneNode::new(
                                format!("root-connection-{}-{k}", subject.id),
                                NodeRole::Decoration(DecorationKind::Structure),
                                Geometry::Mesh(Arc::new(tube.mesh)),
                            )
                            .with_material(material),
                        );
                    }
                    Err(err) => report.issue(BuildIssue::from_tube(Stage::Roots, &subject.id, &err)),
                }
            }
        }

        report
    }

    #[allow(clippy::too_many_arguments)]
    fn add_stem(
        &self,
        subject: &Subject,
        index: usize,
        position: Point3,
        mesh: &Arc<GeomMesh>,
        edges: &Arc<EdgeOverlay>,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
    ) -> NodeId {
        let cfg = self.config;
        let stem = materials
            .material(&subject.area, MaterialKind::Hologram)
            .with_opacity(cfg.stem_opacity);
        let id = scene.add(
            SceneNode::new(
                subject.id.clone(),
                NodeRole::Root {
                    subject: subject.clone(),
                },
                Geometry::Mesh(Arc::clone(mesh)),
            )
            .with_material(stem)
            .with_transform(NodeTransform::at(position))
            .with_animation(AnimationSpec::for_subject(self.animation, index, position))
            .with_area(subject.area.clone()),
        );

        let outline = materials
            .material(&subject.area, MaterialKind::Edges)
            .with_opacity(STEM_EDGE_OPACITY);
        scene.add_child(
            id,
            SceneNode::new(
                format!("{}-edges", subject.id),
                NodeRole::Decoration(DecorationKind::Edges),
                Geometry::Edges {
                    mesh: Arc::clone(mesh),
                    overlay: Arc::clone(edges),
                },
            )
            .with_material(outline.clone()),
        );
        scene.add_child(
            id,
            SceneNode::new(
                format!("{}-halo", subject.id),
                NodeRole::Decoration(DecorationKind::Edges),
                Geometry::Edges {
                    mesh: Arc::clone(mesh),
                    overlay: Arc::clone(edges),
                },
            )
            .with_material(outline.with_opacity(HALO_OPACITY))
            .with_transform(NodeTransform::default().with_scale(cfg.halo_scale)),
        );

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AreaPalette, TreeConfig};
    use crate::geom::Curve3;

    fn subject(id: &str) -> Subject {
        Subject {
            id: id.to_string(),
            name: format!("Root {id}"),
            area: "fundamentos".to_string(),
            ..Subject::default()
        }
    }

    #[test]
    fn stems_are_spread_evenly_on_the_circle() {
        let config = TreeConfig::default();
        let builder = RootsBuilder::new(&config.roots, &config.animation);
        let p0 = builder.stem_position(0, 3);
        let p1 = builder.stem_position(1, 3);
        assert!((p0.x - 4.0).abs() < 1e-12 && p0.z.abs() < 1e-12);
        assert!((p1.z.atan2(p1.x) - TAU / 3.0).abs() < 1e-12);
        assert_eq!(p1.y, config.roots.stem_y);
    }

    #[test]
    fn connections_land_around_the_trunk_base() {
        let config = TreeConfig::default();
        let builder = RootsBuilder::new(&config.roots, &config.animation);
        let stem = builder.stem_position(0, 3);
        let curves = builder.connection_curves(stem);
        assert_eq!(curves.len(), 3);
        for curve in &curves {
            assert_eq!(curve.point_at(0.0), Point3::new(stem.x, 1.25, stem.z));
            let end = curve.point_at(1.0);
            let from_axis = Point3::new(end.x, 2.0, end.z).distance_to(Point3::new(0.0, 2.0, 0.0));
            assert!((from_axis - 2.0).abs() < 1e-9);
        }
        let tube = builder.connection_tube(&curves[0]).unwrap();
        let radii = tube.ring_radii();
        assert!((radii[0] - 0.1).abs() < 1e-9);
        assert!((radii[radii.len() - 1] - 0.04).abs() < 1e-9);
    }

    #[test]
    fn malformed_roots_are_skipped() {
        let config = TreeConfig::default();
        let builder = RootsBuilder::new(&config.roots, &config.animation);
        let mut scene = Scene::new();
        let mut materials = MaterialFactory::new(AreaPalette::default());
        let roots = vec![subject("INF-110"), Subject::default(), subject("MAT-101")];

        let report = builder.build(&roots, 0, &mut scene, &mut materials);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.built, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.interactive.len(), 2);
        assert!(matches!(
            report.issues[0],
            BuildIssue::MalformedContentRecord { index: 1, .. }
        ));
        for id in &report.interactive {
            let node = scene.get(*id).unwrap();
            assert!(matches!(node.role, NodeRole::Root { .. }));
            assert_eq!(node.children().len(), 2);
        }
    }
}
