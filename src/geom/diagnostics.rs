//! Quality report returned alongside every generated mesh.
//!
//! Tube sweeps are open at both ends, so `open_edge_count` equals two rings of
//! boundary edges for a healthy tube. `skipped_reprojection_count` counts
//! vertices that sat on the center line and were left in place by the radius
//! pass.

use std::fmt;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomMeshDiagnostics {
    pub vertex_count: usize,
    pub triangle_count: usize,
    /// Zero-area triangles found while computing normals.
    pub degenerate_triangle_count: usize,
    /// Edges with exactly one adjacent triangle.
    pub open_edge_count: usize,
    /// Edges shared by more than two triangles.
    pub non_manifold_edge_count: usize,
    pub skipped_reprojection_count: usize,
    pub warnings: Vec<String>,
}

impl GeomMeshDiagnostics {
    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.non_manifold_edge_count == 0
            && self.degenerate_triangle_count == 0
            && self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn merge(&mut self, other: &GeomMeshDiagnostics) {
        self.vertex_count += other.vertex_count;
        self.triangle_count += other.triangle_count;
        self.degenerate_triangle_count += other.degenerate_triangle_count;
        self.open_edge_count += other.open_edge_count;
        self.non_manifold_edge_count += other.non_manifold_edge_count;
        self.skipped_reprojection_count += other.skipped_reprojection_count;
        self.warnings.extend(other.warnings.iter().cloned());
    }

    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("V:{} T:{}", self.vertex_count, self.triangle_count)];
        if self.degenerate_triangle_count > 0 {
            parts.push(format!("degenerate:{}", self.degenerate_triangle_count));
        }
        if self.open_edge_count > 0 {
            parts.push(format!("open:{}", self.open_edge_count));
        }
        if self.non_manifold_edge_count > 0 {
            parts.push(format!("non-manifold:{}", self.non_manifold_edge_count));
        }
        if self.skipped_reprojection_count > 0 {
            parts.push(format!("on-axis:{}", self.skipped_reprojection_count));
        }
        parts.join(" ")
    }
}

impl fmt::Display for GeomMeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mesh Diagnostics:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;
        if self.open_edge_count > 0 || self.non_manifold_edge_count > 0 {
            writeln!(f, "  Topology:")?;
            writeln!(f, "    - Open edges: {}", self.open_edge_count)?;
            writeln!(f, "    - Non-manifold edges: {}", self.non_manifold_edge_count)?;
        }
        if !self.warnings.is_empty() {
            writeln!(f, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "    - {warning}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_only_nonzero_counters() {
        let diag = GeomMeshDiagnostics {
            vertex_count: 10,
            triangle_count: 8,
            open_edge_count: 4,
            ..Default::default()
        };
        assert_eq!(diag.summary(), "V:10 T:8 open:4");
        assert!(diag.is_manifold());
    }

    #[test]
    fn merge_accumulates_counts() {
        let mut a = GeomMeshDiagnostics {
            vertex_count: 3,
            warnings: vec!["a".into()],
            ..Default::default()
        };
        let b = GeomMeshDiagnostics {
            vertex_count: 5,
            skipped_reprojection_count: 1,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.vertex_count, 8);
        assert_eq!(a.skipped_reprojection_count, 1);
        assert_eq!(a.warnings.len(), 1);
    }
}
