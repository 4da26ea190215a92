//! Procedural scene of the knowledge tree.
//!
//! The catalog feeds the builders, the builders fill a [`Scene`] arena and the
//! [`TreeAssembler`] ties the stages together.

pub mod assembler;
pub mod branch;
pub mod catalog;
pub mod cluster;
pub mod decorate;
pub mod label;
pub mod lights;
pub mod material;
pub mod node;
pub mod particles;
pub mod roots;
pub mod trunk;

pub use assembler::{BuildIssue, BuildSummary, Stage, StageReport, TreeAssembler, TreeBuild};
pub use catalog::{
    Catalog, CatalogStats, Cluster, ClusterInfo, ContentError, KnowledgeArea, Satellite, Subject,
};
pub use decorate::{Decoration, ParticleDecorator, RingDecorator};
pub use label::{GlyphAtlas, LabelBitmap};
pub use lights::{
    AmbientLight, DirectionalLight, HemisphereLight, LightRig, PointLight, Spotlight,
};
pub use material::{Blending, Color, MaterialFactory, MaterialKind, SurfaceMaterial};
pub use node::{
    AnimationSpec, ContentRef, DecorationKind, Geometry, Glow, NodeId, NodeRole, NodeTransform,
    Oscillation, Scene, SceneNode, SceneStats,
};
pub use particles::{ParticleField, PointStyle};
