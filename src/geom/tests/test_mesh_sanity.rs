use crate::geom::{GeomMesh, Point3, Transform, Vec3, flat_ring, frustum, uv_sphere};

#[test]
fn node_sphere_has_finite_vertices_and_valid_indices() {
    let mesh = uv_sphere(0.25, 24, 24);

    mesh.validate().expect("mesh validate");
    assert_eq!(mesh.vertex_count(), 25 * 25);
    // Pole rows contribute one triangle per quad.
    assert_eq!(mesh.triangle_count(), 24 * 24 * 2 - 2 * 24);

    let normals = mesh.normals.as_ref().expect("normals");
    for (p, n) in mesh.positions.iter().zip(normals) {
        let outward = Vec3::from(*p).dot(Vec3::from(*n));
        assert!(outward >= 0.0);
        assert!((Vec3::from(*n).length() - 1.0).abs() < 1e-12);
    }

    let uvs = mesh.uvs.as_ref().expect("uvs");
    assert_eq!(uvs.len(), mesh.vertex_count());
}

#[test]
fn root_frustum_is_closed_and_spans_height() {
    let mesh = frustum(0.2, 0.5, 0.75, 16);
    mesh.validate().expect("mesh validate");

    let bbox = mesh.bbox().expect("bbox");
    assert!((bbox.min.y + 0.375).abs() < 1e-12);
    assert!((bbox.max.y - 0.375).abs() < 1e-12);

    // Radius about the axis at the bottom is the wider one.
    let bottom_max = mesh
        .positions
        .iter()
        .filter(|p| p[1] < 0.0)
        .map(|p| p[0].hypot(p[2]))
        .fold(0.0, f64::max);
    assert!((bottom_max - 0.5).abs() < 1e-12);
}

#[test]
fn flat_ring_rotated_to_lie_flat_keeps_radii() {
    let ring = flat_ring(0.28, 0.32, 32).transformed(Transform::rotate_x(std::f64::consts::FRAC_PI_2));
    ring.validate().expect("mesh validate");
    for p in &ring.positions {
        assert!(p[1].abs() < 1e-12);
        let r = p[0].hypot(p[2]);
        assert!((r - 0.28).abs() < 1e-12 || (r - 0.32).abs() < 1e-12);
    }
    for n in ring.normals.as_ref().expect("normals") {
        assert!((n[1].abs() - 1.0).abs() < 1e-12);
    }
}

#[test]
fn radius_about_bounds_all_vertices() {
    let mesh = uv_sphere(1.0, 8, 6).transformed(Transform::translate(Vec3::new(1.0, 0.0, 0.0)));
    let r = mesh.radius_about(Point3::new(1.0, 0.0, 0.0));
    assert!((r - 1.0).abs() < 1e-12);
}

#[test]
fn recompute_normals_counts_degenerate_triangles() {
    let mut mesh = GeomMesh::new(
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [2.0, 0.0, 0.0]],
        vec![0, 1, 2, 0, 1, 3],
    );
    assert_eq!(mesh.recompute_normals(), 1);
    let normals = mesh.normals.as_ref().expect("normals");
    assert_eq!(normals[2], [0.0, 0.0, 1.0]);
}

#[test]
fn geom_mesh_validate_rejects_bad_buffers() {
    let mesh = GeomMesh::new(vec![[0.0, 0.0, 0.0]], vec![0]);
    assert!(mesh.validate().is_err());

    let mesh = GeomMesh::new(vec![[0.0, 0.0, 0.0]], vec![0, 1, 0]);
    assert!(mesh.validate().is_err());

    let mesh = GeomMesh::new(vec![[f64::NAN, 0.0, 0.0]], Vec::new());
    assert!(mesh.validate().is_err());
}
