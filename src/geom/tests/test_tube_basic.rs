use crate::geom::{
    CatmullRom3, CubicBezier3, Curve3, Point3, QuadraticBezier3, RadiusProfile, TubeError,
    TubeOptions, sweep_tube,
};

fn gentle_branch() -> CatmullRom3 {
    CatmullRom3::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.5, 0.2),
            Point3::new(3.0, 2.5, 0.8),
            Point3::new(5.0, 2.8, 1.0),
        ],
        0.4,
    )
    .expect("valid curve")
}

#[test]
fn uniform_radius_tube_is_a_cylinder_around_the_center_line() {
    let curve = CatmullRom3::new(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 4.0, 0.0)], 0.5)
        .unwrap();
    let r = 0.3;
    let tube = sweep_tube(&curve, RadiusProfile::uniform(r), TubeOptions::new(16, 12))
        .expect("tube should succeed");

    tube.mesh.validate().expect("mesh validate");
    assert_eq!(tube.ring_count(), 17);
    assert_eq!(tube.mesh.vertex_count(), 17 * 12);
    assert_eq!(tube.diagnostics.skipped_reprojection_count, 0);

    for p in &tube.mesh.positions {
        let p = Point3::from_array(*p);
        let nearest = tube
            .centers
            .iter()
            .map(|c| c.distance_to(p))
            .fold(f64::INFINITY, f64::min);
        assert!((nearest - r).abs() < 1e-9, "vertex {p:?} is {nearest} from the axis");
    }
}

#[test]
fn uniform_radius_on_curved_path_keeps_every_ring_at_radius() {
    let curve = gentle_branch();
    let tube = sweep_tube(&curve, RadiusProfile::uniform(0.1), TubeOptions::new(40, 8)).unwrap();
    for radius in tube.ring_radii() {
        assert!((radius - 0.1).abs() < 1e-9);
    }
}

#[test]
fn linear_profile_matches_end_radii_and_is_monotone() {
    let curve = gentle_branch();
    let profile = RadiusProfile::Linear { start: 0.25, end: 0.05 };
    let tube = sweep_tube(&curve, profile, TubeOptions::new(80, 16)).unwrap();

    let radii = tube.ring_radii();
    assert!((radii[0] - 0.25).abs() < 1e-9);
    assert!((radii[radii.len() - 1] - 0.05).abs() < 1e-9);
    for pair in radii.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-12, "radius grew: {pair:?}");
    }
}

#[test]
fn taper_profile_matches_end_radii_and_is_monotone() {
    let curve = gentle_branch();
    let profile = RadiusProfile::Taper {
        start: 0.25,
        end: 0.05,
        exponent: 1.5,
    };
    let tube = sweep_tube(&curve, profile, TubeOptions::new(80, 16)).unwrap();

    let radii = tube.ring_radii();
    assert!((radii[0] - 0.25).abs() < 1e-9);
    assert!((radii[radii.len() - 1] - 0.05).abs() < 1e-9);
    for pair in radii.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-12);
    }
    // Taper thins faster than linear in the first half.
    assert!(radii[20] < 0.25 + (0.05 - 0.25) * 0.25);
}

#[test]
fn growing_profile_is_monotone_upwards() {
    let curve = gentle_branch();
    let profile = RadiusProfile::Linear { start: 0.05, end: 0.4 };
    let tube = sweep_tube(&curve, profile, TubeOptions::new(20, 6)).unwrap();
    let radii = tube.ring_radii();
    for pair in radii.windows(2) {
        assert!(pair[1] + 1e-12 >= pair[0]);
    }
}

#[test]
fn tube_normals_are_recomputed_and_point_outwards() {
    let curve = CatmullRom3::new(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 0.0, 3.0)], 0.5)
        .unwrap();
    let tube = sweep_tube(&curve, RadiusProfile::uniform(0.5), TubeOptions::new(8, 12)).unwrap();
    let normals = tube.mesh.normals.as_ref().expect("normals");

    // Middle ring: normal should be radial in the XY plane.
    let ring = 4;
    for seg in 0..12 {
        let i = ring * 12 + seg;
        let p = tube.mesh.positions[i];
        let n = normals[i];
        let radial = (p[0] * n[0] + p[1] * n[1]) / (p[0].hypot(p[1]));
        assert!(radial.abs() > 0.99, "normal {n:?} not radial at {p:?}");
        assert!(n[2].abs() < 1e-9);
    }
}

#[test]
fn edge_overlay_shares_the_surface_vertex_buffer() {
    let tube = sweep_tube(&gentle_branch(), RadiusProfile::uniform(0.2), TubeOptions::default()).unwrap();
    assert!(!tube.edges.is_empty());
    assert!(tube.edges.fits(tube.mesh.vertex_count()));
    // Both end rings are open boundaries.
    assert_eq!(tube.diagnostics.open_edge_count, 2 * 16);
    assert!(tube.diagnostics.is_manifold());
}

#[test]
fn tube_rejects_low_resolution_and_bad_radii() {
    let curve = gentle_branch();
    assert_eq!(
        sweep_tube(&curve, RadiusProfile::uniform(0.1), TubeOptions::new(7, 16)).unwrap_err(),
        TubeError::TooFewTubularSegments(7)
    );
    assert_eq!(
        sweep_tube(&curve, RadiusProfile::uniform(0.1), TubeOptions::new(8, 5)).unwrap_err(),
        TubeError::TooFewRadialSegments(5)
    );
    assert!(matches!(
        sweep_tube(&curve, RadiusProfile::Linear { start: 0.0, end: 0.1 }, TubeOptions::default()),
        Err(TubeError::InvalidRadius { .. })
    ));
    assert!(matches!(
        sweep_tube(
            &curve,
            RadiusProfile::Taper { start: 0.2, end: 0.1, exponent: f64::NAN },
            TubeOptions::default()
        ),
        Err(TubeError::InvalidExponent(_))
    ));
}

#[test]
fn tube_over_a_point_curve_is_degenerate() {
    let p = Point3::new(1.0, 1.0, 1.0);
    let curve = QuadraticBezier3::new(p, p, p);
    assert_eq!(curve.point_at(0.5), p);
    assert_eq!(
        sweep_tube(&curve, RadiusProfile::uniform(0.1), TubeOptions::default()).unwrap_err(),
        TubeError::DegenerateCurve
    );
}

#[test]
fn tube_over_coincident_cubic_far_from_origin_is_degenerate() {
    let p = Point3::new(-37.25, 112.5, 0.3);
    let curve = CubicBezier3::new(p, p, p, p);
    assert_eq!(
        sweep_tube(&curve, RadiusProfile::uniform(0.1), TubeOptions::new(64, 12)).unwrap_err(),
        TubeError::DegenerateCurve
    );
}
