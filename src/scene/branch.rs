//! Tapered branches from the trunk canopy out to each cluster.
//!
//! Geometry is computed from plain jobs so it can run on worker threads; only
//! [`BranchBuilder::insert`] touches the scene.

use std::f64::consts::TAU;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{BranchConfig, DecorationConfig};
use crate::geom::{
    CatmullRom3, CurveSpec, Point3, RadiusProfile, TubeMesh, TubeOptions, Vec3, sweep_tube,
};

use super::assembler::{BuildIssue, Stage, StageReport};
use super::catalog::Cluster;
use super::decorate::{Decoration, ParticleDecorator, RingDecorator};
use super::material::{Color, MaterialFactory, MaterialKind};
use super::node::{DecorationKind, Geometry, NodeId, NodeRole, Scene, SceneNode};

const JITTER_SALT: u64 = 0x6272_616e;
const PARTICLE_SALT: u64 = 0x7061_7274;

/// Everything needed to build one branch without touching the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchJob {
    /// Position of the cluster in the catalog; drives angle and variation.
    pub index: usize,
    pub total: usize,
    pub entity: String,
    /// Trunk canopy height.
    pub start_y: f64,
    pub end: Point3,
    pub color: Color,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct BranchGeometry {
    pub index: usize,
    pub entity: String,
    pub color: Color,
    pub curve: Option<CatmullRom3>,
    pub tube: Option<TubeMesh>,
    pub rings: Vec<Decoration>,
    pub particles: Vec<Decoration>,
    pub issue: Option<BuildIssue>,
}

/// Seed for generator `salt` of branch `index`.
#[must_use]
pub fn branch_seed(seed: u64, index: usize, salt: u64) -> u64 {
    seed.wrapping_add((index as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)) ^ salt
}

pub struct BranchBuilder<'a> {
    config: &'a BranchConfig,
    decorations: &'a DecorationConfig,
}

impl<'a> BranchBuilder<'a> {
    #[must_use]
    pub fn new(config: &'a BranchConfig, decorations: &'a DecorationConfig) -> Self {
        Self {
            config,
            decorations,
        }
    }

    /// Where branch `index` leaves the trunk.
    #[must_use]
    pub fn start_point(&self, job: &BranchJob) -> Point3 {
        let angle = job.index as f64 / job.total.max(1) as f64 * TAU;
        let lift = (job.index as f64 * 0.7).sin() * self.config.height_variation;
        Point3::new(
            angle.cos() * self.config.start_radius,
            job.start_y + lift,
            angle.sin() * self.config.start_radius,
        )
    }

    /// Six control points: a rise off the trunk, an arched and twisted middle,
    /// and an approach from just below the cluster.
    #[must_use]
    pub fn control_points(&self, job: &BranchJob) -> Vec<Point3> {
        let start = self.start_point(job);
        let end = job.end;
        let span = end.sub_point(start);
        let direction = span.normalized().unwrap_or(Vec3::X);
        let side = Vec3::new(-direction.z, 0.0, direction.x)
            .normalized()
            .unwrap_or(Vec3::ZERO);

        let i = job.index as f64;
        let curve_factor = 0.3 + (job.index % 3) as f64 * 0.15;
        let twist = (i * 1.3).sin() * 2.0;
        let arch = 1.5 + (job.index % 4) as f64 * 0.5;
        let reach = 0.35 + curve_factor * 0.1;

        vec![
            start,
            Point3::new(
                start.x + direction.x * 1.5 + side.x * twist * 0.3,
                start.y + 1.2,
                start.z + direction.z * 1.5 + side.z * twist * 0.3,
            ),
            Point3::new(
                start.x + span.x * reach + side.x * twist,
                start.y + span.y * 0.5 + arch,
                start.z + span.z * reach + side.z * twist,
            ),
            Point3::new(
                start.x + span.x * 0.7 + side.x * twist * 0.5,
                start.y + span.y * 0.75 + arch * 0.5,
                start.z + span.z * 0.7 + side.z * twist * 0.5,
            ),
            Point3::new(
                end.x - direction.x * 1.2,
                end.y - 0.5,
                end.z - direction.z * 1.2,
            ),
            end,
        ]
    }

    #[must_use]
    pub fn curve_spec(&self, job: &BranchJob) -> CurveSpec {
        let tension = 0.3 + (job.index % 5) as f64 * 0.05;
        CurveSpec::new(self.control_points(job), tension).jittered(
            branch_seed(job.seed, job.index, JITTER_SALT),
            self.config.jitter_amplitude,
        )
    }

    pub fn geometry(&self, job: BranchJob) -> BranchGeometry {
        let mut out = BranchGeometry {
            index: job.index,
            entity: job.entity.clone(),
            color: job.color,
            curve: None,
            tube: None,
            rings: Vec::new(),
            particles: Vec::new(),
            issue: None,
        };

        let curve = match self.curve_spec(&job).build() {
            Ok(curve) => curve,
            Err(err) => {
                out.issue = Some(BuildIssue::from_curve(Stage::Clusters, &job.entity, &err));
                return out;
            }
        };

        let cfg = self.config;
        let profile = RadiusProfile::Taper {
            start: cfg.radius_start,
            end: cfg.radius_end,
            exponent: cfg.taper_exponent,
        };
        match sweep_tube(&curve, profile, TubeOptions::new(cfg.tubular_segments, cfg.radial_segments)) {
            Ok(tube) => out.tube = Some(tube),
            Err(err) => out.issue = Some(BuildIssue::from_tube(Stage::Clusters, &job.entity, &err)),
        }

        out.rings = RingDecorator::from(&self.decorations.branch_rings).decorate(&curve, job.color);
        out.particles = ParticleDecorator::from(&self.decorations.branch_particles).decorate(
            &curve,
            job.color,
            branch_seed(job.seed, job.index, PARTICLE_SALT),
        );
        out.curve = Some(curve);
        out
    }

    /// Geometry for every job, in job order.
    #[cfg(feature = "parallel")]
    pub fn build_all(&self, jobs: Vec<BranchJob>) -> Vec<BranchGeometry> {
        jobs.into_par_iter().map(|job| self.geometry(job)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    pub fn build_all(&self, jobs: Vec<BranchJob>) -> Vec<BranchGeometry> {
        jobs.into_iter().map(|job| self.geometry(job)).collect()
    }

    /// Adds the tube with its outline, rings and particles as children.
    pub fn insert(
        &self,
        branch: BranchGeometry,
        cluster: &Cluster,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
        report: &mut StageReport,
    ) -> Option<NodeId> {
        if let Some(issue) = branch.issue {
            report.issue(issue);
        }
        let cfg = self.config;
        let area = cluster.area.as_str();
        let name = format!("branch-{}", branch.entity);

        let id = match branch.tube {
            Some(tube) => {
                let mesh = Arc::new(tube.mesh);
                let id = scene.add(
                    SceneNode::new(
                        name.clone(),
                        NodeRole::Decoration(DecorationKind::Structure),
                        Geometry::Mesh(Arc::clone(&mesh)),
                    )
                    .with_material(
                        materials
                            .material(area, MaterialKind::Tube)
                            .with_color(branch.color)
                            .with_opacity(cfg.opacity)
                            .with_emissive_intensity(cfg.emissive_intensity),
                    ),
                );
                scene.add_child(
                    id,
                    SceneNode::new(
                        format!("{name}-edges"),
                        NodeRole::Decoration(DecorationKind::Edges),
                        Geometry::Edges {
                            mesh,
                            overlay: Arc::new(tube.edges),
                        },
                    )
                    .with_material(
                        materials
                            .material(area, MaterialKind::Edges)
                            .with_color(branch.color)
                            .with_opacity(cfg.edge_opacity),
                    ),
                );
                id
            }
            None if branch.rings.is_empty() && branch.particles.is_empty() => return None,
            None => scene.add(SceneNode::group(name.clone(), Point3::ORIGIN)),
        };

        let ring = materials.material(area, MaterialKind::Ring).with_wireframe(true);
        for (k, decoration) in branch.rings.into_iter().enumerate() {
            scene.add_child(id, decoration.into_node(format!("{name}-ring-{k}"), ring.clone()));
        }
        let particle = materials.material(area, MaterialKind::Particle);
        for (k, decoration) in branch.particles.into_iter().enumerate() {
            scene.add_child(id, decoration.into_node(format!("{name}-particle-{k}"), particle.clone()));
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use crate::geom::Curve3;

    fn job(index: usize, total: usize) -> BranchJob {
        BranchJob {
            index,
            total,
            entity: format!("cluster-{index}"),
            start_y: 7.0,
            end: Point3::new(6.0, 10.0, 0.0),
            color: Color::from_hex(0x00bfff),
            seed: 99,
        }
    }

    #[test]
    fn branches_leave_the_trunk_at_evenly_spaced_angles() {
        let config = TreeConfig::default();
        let builder = BranchBuilder::new(&config.branches, &config.decorations);
        for index in 0..5 {
            let start = builder.start_point(&job(index, 5));
            let angle = start.z.atan2(start.x).rem_euclid(TAU);
            let expected = index as f64 / 5.0 * TAU;
            assert!((angle - expected).abs() < 1e-9 || (angle - expected).abs() > TAU - 1e-9);
            assert!((start.x.hypot(start.z) - 0.6).abs() < 1e-12);
            assert!((start.y - 7.0 - (index as f64 * 0.7).sin() * 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn branch_curve_ends_on_the_cluster_and_is_reproducible() {
        let config = TreeConfig::default();
        let builder = BranchBuilder::new(&config.branches, &config.decorations);
        let a = builder.geometry(job(2, 5));
        let b = builder.geometry(job(2, 5));
        let curve = a.curve.as_ref().unwrap();
        assert_eq!(curve.point_at(1.0), Point3::new(6.0, 10.0, 0.0));
        assert_eq!(curve.point_at(0.0), builder.start_point(&job(2, 5)));
        assert_eq!(a.curve, b.curve);
        assert_eq!(a.particles, b.particles);
        assert!(a.issue.is_none());

        let radii = a.tube.as_ref().unwrap().ring_radii();
        assert!((radii[0] - 0.25).abs() < 1e-9);
        assert!((radii[radii.len() - 1] - 0.05).abs() < 1e-9);
        assert_eq!(a.rings.len(), 8);
        assert_eq!(a.particles.len(), 26);
    }

    #[test]
    fn tree_seed_changes_the_jitter() {
        let config = TreeConfig::default();
        let builder = BranchBuilder::new(&config.branches, &config.decorations);
        let mut reseeded = job(2, 5);
        reseeded.seed = 100;
        let a = builder.curve_spec(&job(2, 5));
        let b = builder.curve_spec(&reseeded);
        assert_ne!(a, b);
        assert_eq!(a.control_points[0], b.control_points[0]);
        assert_eq!(a.control_points[5], b.control_points[5]);
    }

    #[test]
    fn degenerate_branch_reports_an_issue_and_adds_nothing() {
        let mut config = TreeConfig::default();
        config.branches.radius_end = 0.0;
        let builder = BranchBuilder::new(&config.branches, &config.decorations);
        let geometry = builder.geometry(job(0, 1));
        assert!(matches!(geometry.issue, Some(BuildIssue::TubeFailed { .. })));
        assert!(geometry.tube.is_none());

        let cluster = Cluster {
            id: "cluster-0".to_string(),
            name: "Web".to_string(),
            area: "web".to_string(),
            ..Cluster::default()
        };
        let mut scene = Scene::new();
        let mut materials = MaterialFactory::new(config.palette.clone());
        let mut report = StageReport::new(Stage::Clusters);
        let id = builder
            .insert(geometry, &cluster, &mut scene, &mut materials, &mut report)
            .unwrap();
        assert_eq!(report.issues.len(), 1);
        // Decorations still hang off a plain group.
        let node = scene.get(id).unwrap();
        assert_eq!(node.geometry, Geometry::Group);
        assert_eq!(node.children().len(), 8 + 26);
    }

    #[test]
    fn inserted_branch_owns_its_decorations() {
        let config = TreeConfig::default();
        let builder = BranchBuilder::new(&config.branches, &config.decorations);
        let cluster = Cluster {
            id: "cluster-1".to_string(),
            name: "IA".to_string(),
            area: "ia".to_string(),
            ..Cluster::default()
        };
        let mut scene = Scene::new();
        let mut materials = MaterialFactory::new(config.palette.clone());
        let mut report = StageReport::new(Stage::Clusters);
        let geometry = builder.build_all(vec![job(1, 5)]).remove(0);
        let id = builder
            .insert(geometry, &cluster, &mut scene, &mut materials, &mut report)
            .unwrap();

        let node = scene.get(id).unwrap();
        assert!(matches!(node.geometry, Geometry::Mesh(_)));
        assert_eq!(node.children().len(), 1 + 8 + 26);
        assert_eq!(scene.len(), 1 + 1 + 8 + 26);
        let material = node.material.as_ref().unwrap();
        assert_eq!(material.opacity, 0.5);
        assert_eq!(material.emissive_intensity, 0.6);
        assert!(report.issues.is_empty());
    }
}
