//! Builds the whole tree: roots, then trunk, then branches and clusters.
//!
//! Stages only share the trunk canopy point. A stage that fails to produce
//! geometry records a [`BuildIssue`] and the next stage still runs, so a bad
//! record costs at most its own nodes.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::config::TreeConfig;
use crate::geom::{CurveError, Point3, TubeError};
use crate::interaction::{EventSink, SceneEvent};

use super::branch::{BranchBuilder, BranchGeometry, BranchJob};
use super::catalog::{Catalog, ContentError, validate_cluster};
use super::cluster::ClusterBuilder;
use super::material::MaterialFactory;
use super::node::{NodeId, Scene};
use super::roots::RootsBuilder;
use super::trunk::TrunkBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Roots,
    Trunk,
    Clusters,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Roots => "roots",
            Self::Trunk => "trunk",
            Self::Clusters => "clusters",
        })
    }
}

/// A problem that cost part of the tree but did not stop the build.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildIssue {
    #[error("{stage}: invalid curve for `{entity}`: {reason}")]
    InvalidCurveSpec {
        stage: Stage,
        entity: String,
        reason: String,
    },
    #[error("{stage}: tube for `{entity}` failed: {reason}")]
    TubeFailed {
        stage: Stage,
        entity: String,
        reason: String,
    },
    #[error("{stage}: record {index} skipped: {reason}")]
    MalformedContentRecord {
        stage: Stage,
        index: usize,
        reason: String,
    },
    #[error("unknown area tag `{area}`")]
    UnknownAreaTag { area: String },
}

impl BuildIssue {
    #[must_use]
    pub fn from_curve(stage: Stage, entity: &str, err: &CurveError) -> Self {
        Self::InvalidCurveSpec {
            stage,
            entity: entity.to_string(),
            reason: err.to_string(),
        }
    }

    /// Curve errors surfaced through the sweep keep their own class.
    #[must_use]
    pub fn from_tube(stage: Stage, entity: &str, err: &TubeError) -> Self {
        match err {
            TubeError::Curve(curve) => Self::from_curve(stage, entity, curve),
            other => Self::TubeFailed {
                stage,
                entity: entity.to_string(),
                reason: other.to_string(),
            },
        }
    }

    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::MalformedContentRecord { .. })
    }
}

/// Counts for one stage. `attempted` counts content records, `built` counts
/// interactive nodes created from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub attempted: usize,
    pub built: usize,
    pub skipped: usize,
    pub issues: Vec<BuildIssue>,
    #[serde(skip)]
    pub interactive: Vec<NodeId>,
}

impl StageReport {
    #[must_use]
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            attempted: 0,
            built: 0,
            skipped: 0,
            issues: Vec::new(),
            interactive: Vec::new(),
        }
    }

    pub fn skip(&mut self, index: usize, err: &ContentError) {
        self.skipped += 1;
        self.issue(BuildIssue::MalformedContentRecord {
            stage: self.stage,
            index,
            reason: err.to_string(),
        });
    }

    pub fn record_built(&mut self, id: NodeId) {
        self.built += 1;
        self.interactive.push(id);
    }

    pub fn issue(&mut self, issue: BuildIssue) {
        log::warn!("{issue}");
        self.issues.push(issue);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSummary {
    pub stages: Vec<StageReport>,
    /// Every stage issue followed by one `UnknownAreaTag` per distinct tag.
    pub issues: Vec<BuildIssue>,
    pub unknown_areas: Vec<String>,
    pub interactive_count: usize,
    pub node_count: usize,
    pub canopy_y: f64,
}

impl BuildSummary {
    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.stages.iter().map(|report| report.attempted).sum()
    }

    #[must_use]
    pub fn built(&self) -> usize {
        self.stages.iter().map(|report| report.built).sum()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.stages.iter().map(|report| report.skipped).sum()
    }

    /// Records left out of the tree, with reasons.
    pub fn skipped_entries(&self) -> impl Iterator<Item = &BuildIssue> {
        self.issues.iter().filter(|issue| issue.is_skip())
    }
}

/// Output of [`TreeAssembler::assemble`].
#[derive(Debug, Clone)]
pub struct TreeBuild {
    pub scene: Scene,
    /// Interactive nodes in build order: roots, trunk, then per cluster the
    /// central node followed by its satellites.
    pub interactive: Vec<NodeId>,
    pub summary: BuildSummary,
}

pub struct TreeAssembler<'a> {
    config: &'a TreeConfig,
    sink: Rc<dyn EventSink>,
}

impl<'a> TreeAssembler<'a> {
    #[must_use]
    pub fn new(config: &'a TreeConfig, sink: Rc<dyn EventSink>) -> Self {
        Self { config, sink }
    }

    pub fn assemble(&self, catalog: &Catalog) -> TreeBuild {
        let config = self.config;
        log::info!(
            "building tree: {} roots, {} trunk subjects, {} clusters",
            catalog.roots.len(),
            catalog.trunk.len(),
            catalog.clusters.len()
        );

        let mut scene = Scene::new();
        let mut materials = MaterialFactory::new(config.palette.clone());

        let roots = RootsBuilder::new(&config.roots, &config.animation).build(
            &catalog.roots,
            0,
            &mut scene,
            &mut materials,
        );

        let (trunk, trunk_output) =
            TrunkBuilder::new(&config.trunk, &config.nodes, &config.animation, config.seed).build(
                &catalog.trunk,
                roots.built,
                &mut scene,
                &mut materials,
            );

        let clusters = self.build_clusters(catalog, trunk_output.canopy, &mut scene, &mut materials);

        let stages = vec![roots, trunk, clusters];
        let unknown_areas = materials.take_unknown_areas();
        let mut issues: Vec<BuildIssue> = stages
            .iter()
            .flat_map(|report| report.issues.iter().cloned())
            .collect();
        issues.extend(
            unknown_areas
                .iter()
                .map(|area| BuildIssue::UnknownAreaTag { area: area.clone() }),
        );
        let interactive: Vec<NodeId> = stages
            .iter()
            .flat_map(|report| report.interactive.iter().copied())
            .collect();

        let summary = BuildSummary {
            stages,
            issues,
            unknown_areas,
            interactive_count: interactive.len(),
            node_count: scene.len(),
            canopy_y: trunk_output.canopy.y,
        };
        log::info!(
            "tree built: {} nodes, {} interactive, {} skipped, {} issues",
            summary.node_count,
            summary.interactive_count,
            summary.skipped(),
            summary.issues.len()
        );
        self.sink.publish(SceneEvent::TreeBuilt {
            interactive: summary.interactive_count,
            nodes: summary.node_count,
            skipped: summary.skipped(),
            issues: summary.issues.len(),
        });

        TreeBuild {
            scene,
            interactive,
            summary,
        }
    }

    /// Branch geometry is computed up front (in parallel with the `parallel`
    /// feature); nodes are then inserted cluster by cluster.
    fn build_clusters(
        &self,
        catalog: &Catalog,
        canopy: Point3,
        scene: &mut Scene,
        materials: &mut MaterialFactory,
    ) -> StageReport {
        let config = self.config;
        let mut report = StageReport::new(Stage::Clusters);
        let total = catalog.clusters.len();

        let mut valid = Vec::with_capacity(total);
        let mut jobs = Vec::with_capacity(total);
        for (i, cluster) in catalog.clusters.iter().enumerate() {
            report.attempted += 1;
            if let Err(err) = validate_cluster(cluster) {
                report.skip(i, &err);
                continue;
            }
            jobs.push(BranchJob {
                index: i,
                total,
                entity: cluster.id.clone(),
                start_y: canopy.y,
                end: Point3::from_array(cluster.position),
                color: materials.color_for(&cluster.area),
                seed: config.seed,
            });
            valid.push(cluster);
        }

        let branches = BranchBuilder::new(&config.branches, &config.decorations);
        let geometry: Vec<BranchGeometry> = branches.build_all(jobs);
        log::debug!("branch geometry ready for {} clusters", geometry.len());

        let cluster_builder = ClusterBuilder::new(&config.clusters, config.seed);
        for (cluster, branch) in valid.into_iter().zip(geometry) {
            branches.insert(branch, cluster, scene, materials, &mut report);
            cluster_builder.build(cluster, scene, materials, &mut report);
        }

        report
    }
}
