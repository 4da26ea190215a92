//! A specialization cluster: central node, orbiting satellites, connectors
//! and labels, all under one group placed at the cluster position.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ClusterConfig, LabelStyle};
use crate::geom::{
    Curve3, GeomMesh, LineStrip, Point3, QuadraticBezier3, Transform, flat_ring, uv_sphere,
};

use super::assembler::StageReport;
use super::catalog::{Cluster, Satellite, validate_satellite};
use super::label::LabelBitmap;
use super::material::{Color, MaterialFactory, MaterialKind};
use super::node::{
    AnimationSpec, DecorationKind, Geometry, NodeId, NodeRole, NodeTransform, Oscillation, Scene,
    SceneNode,
};

const CENTRAL_RING_SEGMENTS: usize = 32;
const SATELLITE_RING_SEGMENTS: usize = 24;
const SATELLITE_SHELL_SEGMENTS: usize = 12;
const CENTRAL_SHELL_SEGMENTS: usize = 16;
/// Central orbit rings are `radius * k` wide by ±5%.
const RING_HALF_WIDTH: f64 = 0.05;

/// Node ids produced for one cluster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterNodes {
    pub group: NodeId,
    pub central: NodeId,
    pub satellites: Vec<NodeId>,
    pub connectors: Vec<NodeId>,
    pub labels: Vec<NodeId>,
}

/// FNV-1a of the cluster id mixed into the tree seed.
fn cluster_seed(seed: u64, id: &str) -> u64 {
    id.bytes().fold(0xcbf2_9ce4_8422_2325 ^ seed, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

pub struct ClusterBuilder<'a> {
    config: &'a ClusterConfig,
    seed: u64,
}

impl<'a> ClusterBuilder<'a> {
    #[must_use]
    pub fn new(config: &'a ClusterConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    /// Local position of satellite `index` of `count`, before jitter.
    #[must_use]
    pub fn satellite_position(&self, index: usize, count: usize) -> Point3 {
        self.satellite_position_with(index, count, 0.0)
    }

    fn satellite_position_with(&self, index: usize, count: usize, jitter: f64) -> Point3 {
        let orbit = &self.config.orbit;
        let angle = index as f64 * (TAU / count.max(1) as f64) + jitter;
        Point3::new(
            angle.cos() * orbit.radius,
            (index as f64 * orbit.float_speed).sin() * orbit.float_amount,
            angle.sin() * orbit.radius,
        )
    }

    /// Adds the cluster. Satellites without id or name are skipped and the
    /// rest are spread evenly over the orbit.
    pub fn build(
        &self,
        cluster: &Cluster,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
        report: &mut StageReport,
    ) -> ClusterNodes {
        let mut satellites: Vec<&Satellite> = Vec::with_capacity(cluster.satellites.len());
        for (i, satellite) in cluster.satellites.iter().enumerate() {
            report.attempted += 1;
            match validate_satellite(satellite) {
                Ok(()) => satellites.push(satellite),
                Err(err) => report.skip(i, &err),
            }
        }

        let group = scene.add(SceneNode::group(
            format!("cluster-{}", cluster.id),
            Point3::from_array(cluster.position),
        ));
        let central = self.add_central(cluster, satellites.len(), group, scene, materials);
        report.record_built(central);

        let mut nodes = ClusterNodes {
            group,
            central,
            ..ClusterNodes::default()
        };
        let labels = &self.config.labels;
        let central_radius = self.config.central.radius;
        let color = materials.color_for(&cluster.area);
        nodes.labels.push(self.add_label(
            &cluster.name,
            &cluster.area,
            color,
            &labels.central,
            Point3::new(0.0, central_radius, 0.0),
            group,
            central,
            scene,
            materials,
        ));

        let jitter = self.config.orbit.angle_jitter.abs();
        let mut rng = StdRng::seed_from_u64(cluster_seed(self.seed, &cluster.id));
        let count = satellites.len();
        for (i, satellite) in satellites.into_iter().enumerate() {
            let offset = if jitter > 0.0 {
                rng.random_range(-jitter..=jitter)
            } else {
                0.0
            };
            let position = self.satellite_position_with(i, count, offset);
            let area = if satellite.area.is_empty() {
                cluster.area.as_str()
            } else {
                satellite.area.as_str()
            };

            let id = self.add_satellite(satellite, i, area, position, group, scene, materials);
            report.record_built(id);
            nodes.satellites.push(id);
            nodes.connectors.push(self.add_connector(satellite, area, position, group, id, scene, materials));

            let color = materials.color_for(area);
            nodes.labels.push(self.add_label(
                &satellite.name,
                area,
                color,
                &labels.satellite,
                position,
                group,
                id,
                scene,
                materials,
            ));
        }

        log::debug!(
            "cluster `{}`: {} satellites, {} connectors",
            cluster.id,
            nodes.satellites.len(),
            nodes.connectors.len()
        );
        nodes
    }

    fn add_central(
        &self,
        cluster: &Cluster,
        satellite_count: usize,
        group: NodeId,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
    ) -> NodeId {
        let cfg = &self.config.central;
        let area = cluster.area.as_str();
        let mut info = cluster.info();
        info.satellite_count = satellite_count;

        let central = scene.add_child(
            group,
            SceneNode::new(
                cluster.id.clone(),
                NodeRole::ClusterCentral { cluster: info },
                Geometry::Mesh(Arc::new(uv_sphere(cfg.radius, cfg.segments, cfg.segments))),
            )
            .with_material(
                materials
                    .material(area, MaterialKind::Node)
                    .with_opacity(cfg.opacity)
                    .with_emissive_intensity(cfg.emissive_intensity),
            )
            .with_animation(AnimationSpec::at_rest(Point3::ORIGIN).with_pulse(Oscillation {
                amplitude: cfg.pulse_amount,
                frequency: cfg.pulse_speed,
                phase: 0.0,
            }))
            .with_area(area),
        );

        let shell_segments = CENTRAL_SHELL_SEGMENTS;
        scene.add_child(
            central,
            SceneNode::new(
                format!("{}-shell", cluster.id),
                NodeRole::Decoration(DecorationKind::Shell),
                Geometry::Mesh(Arc::new(uv_sphere(
                    cfg.radius * cfg.shell_scale,
                    shell_segments,
                    shell_segments,
                ))),
            )
            .with_material(materials.material(area, MaterialKind::Hologram).with_opacity(cfg.shell_opacity)),
        );

        for (k, ring) in cfg.rings.iter().enumerate() {
            let radius = cfg.radius * ring.radius;
            let spin = if k % 2 == 0 { cfg.ring_spin } else { -cfg.ring_spin };
            scene.add_child(
                central,
                SceneNode::new(
                    format!("{}-ring-{k}", cluster.id),
                    NodeRole::Decoration(DecorationKind::Ring),
                    Geometry::Mesh(Arc::new(flat_ring(
                        radius * (1.0 - RING_HALF_WIDTH),
                        radius * (1.0 + RING_HALF_WIDTH),
                        CENTRAL_RING_SEGMENTS,
                    ))),
                )
                .with_material(materials.material(area, MaterialKind::Ring).with_opacity(ring.opacity))
                .with_transform(NodeTransform::default().with_orientation(Transform::rotate_x(FRAC_PI_2)))
                .with_animation(AnimationSpec::spinning(Point3::ORIGIN, spin)),
            );
        }
        central
    }

    #[allow(clippy::too_many_arguments)]
    fn add_satellite(
        &self,
        satellite: &Satellite,
        index: usize,
        area: &str,
        position: Point3,
        group: NodeId,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
    ) -> NodeId {
        let cfg = &self.config.satellite;
        // Phase follows the orbit position so neighbours drift apart.
        let phase = position.x;
        let id = scene.add_child(
            group,
            SceneNode::new(
                satellite.id.clone(),
                NodeRole::ClusterSatellite {
                    satellite: satellite.clone(),
                    index,
                },
                Geometry::Mesh(Arc::new(uv_sphere(cfg.radius, cfg.segments, cfg.segments))),
            )
            .with_material(
                materials
                    .material(area, MaterialKind::Node)
                    .with_opacity(cfg.opacity)
                    .with_emissive_intensity(cfg.emissive_intensity),
            )
            .with_transform(NodeTransform::at(position))
            .with_animation(
                AnimationSpec::at_rest(position)
                    .with_pulse(Oscillation {
                        amplitude: cfg.pulse_amount,
                        frequency: cfg.pulse_speed,
                        phase,
                    })
                    .with_float(Oscillation {
                        amplitude: cfg.float_amount,
                        frequency: cfg.float_speed,
                        phase,
                    }),
            )
            .with_area(area),
        );

        let shell: GeomMesh = uv_sphere(
            cfg.radius * cfg.shell_scale,
            SATELLITE_SHELL_SEGMENTS,
            SATELLITE_SHELL_SEGMENTS,
        );
        scene.add_child(
            id,
            SceneNode::new(
                format!("{}-shell", satellite.id),
                NodeRole::Decoration(DecorationKind::Shell),
                Geometry::Mesh(Arc::new(shell)),
            )
            .with_material(materials.material(area, MaterialKind::Hologram).with_opacity(cfg.shell_opacity)),
        );
        scene.add_child(
            id,
            SceneNode::new(
                format!("{}-ring", satellite.id),
                NodeRole::Decoration(DecorationKind::Ring),
                Geometry::Mesh(Arc::new(flat_ring(
                    cfg.ring_inner_radius,
                    cfg.ring_outer_radius,
                    SATELLITE_RING_SEGMENTS,
                ))),
            )
            .with_material(materials.material(area, MaterialKind::Ring).with_opacity(cfg.ring_opacity))
            .with_transform(NodeTransform::default().with_orientation(Transform::rotate_x(FRAC_PI_2)))
            .with_animation(AnimationSpec::spinning(Point3::ORIGIN, cfg.ring_spin)),
        );
        id
    }

    /// Arched line from the satellite to the cluster center.
    #[must_use]
    pub fn connector_curve(&self, satellite: Point3) -> QuadraticBezier3 {
        QuadraticBezier3::arched(satellite, Point3::ORIGIN, self.config.connections.curve_height)
    }

    #[allow(clippy::too_many_arguments)]
    fn add_connector(
        &self,
        satellite: &Satellite,
        area: &str,
        position: Point3,
        group: NodeId,
        owner: NodeId,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
    ) -> NodeId {
        let cfg = &self.config.connections;
        let points = self.connector_curve(position).sample(cfg.divisions);
        scene.add_child(
            group,
            SceneNode::new(
                format!("{}-connector", satellite.id),
                NodeRole::Decoration(DecorationKind::Connector),
                Geometry::Lines(LineStrip::from_points(&points)),
            )
            .with_material(materials.material(area, MaterialKind::Line).with_opacity(cfg.opacity))
            .with_owner(owner),
        )
    }

    /// Label quad `style.offset_y` above `anchor`, hidden with `owner`.
    #[allow(clippy::too_many_arguments)]
    fn add_label(
        &self,
        text: &str,
        area: &str,
        color: Color,
        style: &LabelStyle,
        anchor: Point3,
        group: NodeId,
        owner: NodeId,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
    ) -> NodeId {
        let bitmap = LabelBitmap::render(text, color, style);
        let position = Point3::new(anchor.x, anchor.y + style.offset_y, anchor.z);
        scene.add_child(
            group,
            SceneNode::new(
                format!("label-{text}"),
                NodeRole::Decoration(DecorationKind::Label),
                Geometry::Label(Box::new(bitmap)),
            )
            .with_material(materials.material(area, MaterialKind::Label).with_opacity(style.opacity))
            .with_transform(NodeTransform::at(position))
            .with_owner(owner),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use crate::scene::assembler::{BuildIssue, Stage};

    fn cluster(satellites: usize) -> Cluster {
        Cluster {
            id: "ia".to_string(),
            name: "Inteligencia Artificial".to_string(),
            area: "ia".to_string(),
            position: [-6.0, 11.0, 2.0],
            subjects: Vec::new(),
            satellites: (0..satellites)
                .map(|i| Satellite {
                    id: format!("ia-{i}"),
                    name: format!("Tema {i}"),
                    description: String::new(),
                    area: "ia".to_string(),
                })
                .collect(),
        }
    }

    fn build(config: &ClusterConfig, cluster: &Cluster) -> (Scene, ClusterNodes, StageReport) {
        let mut scene = Scene::new();
        let mut materials = MaterialFactory::new(TreeConfig::default().palette);
        let mut report = StageReport::new(Stage::Clusters);
        let nodes = ClusterBuilder::new(config, 5).build(cluster, &mut scene, &mut materials, &mut report);
        (scene, nodes, report)
    }

    fn local_angle(scene: &Scene, id: NodeId) -> f64 {
        let p = scene.get(id).unwrap().transform.position;
        p.z.atan2(p.x).rem_euclid(TAU)
    }

    #[test]
    fn n_satellites_give_n_nodes_and_n_connectors_at_exact_angles() {
        let config = ClusterConfig::default();
        for n in [6usize, 7, 10] {
            let (scene, nodes, report) = build(&config, &cluster(n));
            assert_eq!(nodes.satellites.len(), n);
            assert_eq!(nodes.connectors.len(), n);
            assert_eq!(nodes.labels.len(), n + 1);
            assert_eq!(report.built, n + 1);

            for (i, id) in nodes.satellites.iter().enumerate() {
                let expected = i as f64 * (TAU / n as f64);
                let angle = local_angle(&scene, *id);
                let diff = (angle - expected).abs();
                assert!(diff < 1e-9 || (TAU - diff) < 1e-9, "satellite {i} of {n}: {angle}");
                let p = scene.get(*id).unwrap().transform.position;
                assert!((p.x.hypot(p.z) - 2.5).abs() < 1e-12);
                assert_eq!(p.y, (i as f64 * 0.8).sin() * 0.3);
                assert_eq!(p, ClusterBuilder::new(&config, 5).satellite_position(i, n));
            }
        }
    }

    #[test]
    fn connectors_arch_from_satellite_to_center() {
        let config = ClusterConfig::default();
        let (scene, nodes, _) = build(&config, &cluster(5));
        let satellite = scene.get(nodes.satellites[2]).unwrap().transform.position;
        let connector = scene.get(nodes.connectors[2]).unwrap();
        let Geometry::Lines(lines) = &connector.geometry else {
            panic!("connector should be a line strip");
        };
        assert_eq!(lines.points.len(), 31);
        assert_eq!(lines.points[0], satellite.to_array());
        assert_eq!(lines.points[30], [0.0, 0.0, 0.0]);
        let mid = lines.points[15];
        assert!((mid[1] - (satellite.y * 0.5 + 0.2)).abs() < 1e-9);
        assert_eq!(connector.owner, Some(nodes.satellites[2]));
    }

    #[test]
    fn single_satellite_sits_at_angle_zero() {
        let config = ClusterConfig::default();
        let (scene, nodes, _) = build(&config, &cluster(1));
        assert_eq!(nodes.satellites.len(), 1);
        let p = scene.get(nodes.satellites[0]).unwrap().transform.position;
        assert_eq!(p, Point3::new(2.5, 0.0, 0.0));
        assert_eq!(p, ClusterBuilder::new(&config, 5).satellite_position(0, 1));
    }

    #[test]
    fn empty_cluster_builds_only_the_central_node() {
        let config = ClusterConfig::default();
        let (scene, nodes, report) = build(&config, &cluster(0));
        assert!(nodes.satellites.is_empty());
        assert!(nodes.connectors.is_empty());
        assert_eq!(report.interactive, vec![nodes.central]);
        assert_eq!(scene.world_position(nodes.central), Point3::new(-6.0, 11.0, 2.0));
        let central = scene.get(nodes.central).unwrap();
        // Shell plus two orbit rings.
        assert_eq!(central.children().len(), 3);
        assert!(matches!(&central.role, NodeRole::ClusterCentral { cluster } if cluster.satellite_count == 0));
    }

    #[test]
    fn invalid_satellites_are_skipped_and_the_rest_stay_even() {
        let config = ClusterConfig::default();
        let mut cluster = cluster(5);
        cluster.satellites[1].id.clear();
        let (scene, nodes, report) = build(&config, &cluster);
        assert_eq!(report.attempted, 5);
        assert_eq!(report.skipped, 1);
        assert!(matches!(report.issues[0], BuildIssue::MalformedContentRecord { index: 1, .. }));
        assert_eq!(nodes.satellites.len(), 4);
        let angle = local_angle(&scene, nodes.satellites[1]);
        assert!((angle - TAU / 4.0).abs() < 1e-9);
    }

    #[test]
    fn angle_jitter_is_opt_in_and_seeded() {
        let mut config = ClusterConfig::default();
        config.orbit.angle_jitter = 0.1;
        let (a, nodes_a, _) = build(&config, &cluster(6));
        let (b, nodes_b, _) = build(&config, &cluster(6));
        for (i, (ia, ib)) in nodes_a.satellites.iter().zip(&nodes_b.satellites).enumerate() {
            assert_eq!(a.get(*ia).unwrap().transform, b.get(*ib).unwrap().transform);
            let expected = i as f64 * TAU / 6.0;
            let diff = (local_angle(&a, *ia) - expected).abs();
            assert!(diff <= 0.1 + 1e-9 || (TAU - diff) <= 0.1 + 1e-9);
        }
    }

    #[test]
    fn labels_follow_their_owner_when_filtered() {
        let config = ClusterConfig::default();
        let (mut scene, nodes, _) = build(&config, &cluster(3));
        let label = *nodes.labels.last().unwrap();
        assert!(matches!(scene.get(label).unwrap().geometry, Geometry::Label(_)));
        scene.filter_by_area("web");
        assert!(!scene.is_visible_in_world(label));
        scene.show_all();
        assert!(scene.is_visible_in_world(label));
    }
}
