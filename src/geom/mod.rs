mod bvh;
mod core;
mod curve;
mod diagnostics;
mod mesh;
mod tube;

pub use bvh::Bvh;
pub use core::{BBox, Point3, Ray3, Tolerance, Transform, Vec3};
pub use curve::{
    CatmullRom3, CubicBezier3, Curve3, CurveError, CurveSpec, QuadraticBezier3, jitter_interior,
};
pub use diagnostics::GeomMeshDiagnostics;
pub use mesh::{
    EdgeOverlay, GeomMesh, LineStrip, feature_edges, flat_ring, frustum, torus, uv_sphere,
};
pub use tube::{RadiusProfile, TubeError, TubeMesh, TubeOptions, sweep_tube};

#[cfg(test)]
mod tests;
