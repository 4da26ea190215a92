use crate::geom::{
    CatmullRom3, CubicBezier3, Curve3, CurveError, CurveSpec, Point3, QuadraticBezier3, Tolerance,
    jitter_interior,
};

fn branch_points() -> Vec<Point3> {
    vec![
        Point3::new(0.6, 7.0, 0.0),
        Point3::new(2.1, 8.2, 0.4),
        Point3::new(3.5, 10.0, 1.6),
        Point3::new(5.8, 9.6, 2.2),
        Point3::new(6.9, 8.5, 3.1),
        Point3::new(8.0, 9.0, 4.0),
    ]
}

#[test]
fn catmull_rom_hits_end_points_exactly() {
    for tension in [0.0, 0.3, 0.5, 1.0] {
        let points = branch_points();
        let curve = CatmullRom3::new(points.clone(), tension).expect("valid curve");
        assert_eq!(curve.point_at(0.0), points[0]);
        assert_eq!(curve.point_at(1.0), points[points.len() - 1]);
    }
}

#[test]
fn catmull_rom_two_points_is_the_segment() {
    let a = Point3::new(-1.0, 2.0, 0.5);
    let b = Point3::new(3.0, -2.0, 4.5);
    let curve = CatmullRom3::new(vec![a, b], 0.5).unwrap();
    assert_eq!(curve.point_at(0.0), a);
    assert_eq!(curve.point_at(1.0), b);
    let mid = curve.point_at(0.5);
    assert!(Tolerance::LOOSE.approx_eq_point3(mid, a.lerp(b, 0.5)));
}

#[test]
fn catmull_rom_passes_through_interior_points() {
    let points = branch_points();
    let curve = CatmullRom3::new(points.clone(), 0.35).unwrap();
    let spans = (points.len() - 1) as f64;
    for (i, p) in points.iter().enumerate() {
        let q = curve.point_at(i as f64 / spans);
        assert!(q.distance_to(*p) < 1e-9, "control point {i}: {q:?} vs {p:?}");
    }
}

#[test]
fn catmull_rom_tangent_is_continuous_at_interior_points() {
    let points = branch_points();
    let curve = CatmullRom3::new(points.clone(), 0.4).unwrap();
    let spans = (points.len() - 1) as f64;
    let h = 1e-7;
    for i in 1..points.len() - 1 {
        let t = i as f64 / spans;
        let before = curve.derivative_at(t - h);
        let after = curve.derivative_at(t + h);
        assert!((before - after).length() < 1e-4, "derivative jump at point {i}");
    }
}

#[test]
fn catmull_rom_rejects_degenerate_specs() {
    assert_eq!(
        CatmullRom3::new(vec![Point3::ORIGIN], 0.5),
        Err(CurveError::TooFewControlPoints { count: 1 })
    );
    assert_eq!(
        CatmullRom3::new(Vec::new(), 0.5),
        Err(CurveError::TooFewControlPoints { count: 0 })
    );
    assert_eq!(
        CatmullRom3::new(vec![Point3::ORIGIN, Point3::new(f64::NAN, 0.0, 0.0)], 0.5),
        Err(CurveError::NonFiniteControlPoint { index: 1 })
    );
    assert!(matches!(
        CatmullRom3::new(vec![Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0)], 1.5),
        Err(CurveError::TensionOutOfRange(_))
    ));
}

#[test]
fn jitter_is_deterministic_per_seed_and_keeps_end_points() {
    let base = branch_points();
    let a = CurveSpec::new(base.clone(), 0.3).jittered(7, 0.2);
    let b = CurveSpec::new(base.clone(), 0.3).jittered(7, 0.2);
    let c = CurveSpec::new(base.clone(), 0.3).jittered(8, 0.2);

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.control_points[0], base[0]);
    assert_eq!(a.control_points[base.len() - 1], base[base.len() - 1]);

    for (moved, original) in a.control_points.iter().zip(&base) {
        let d = moved.sub_point(*original);
        assert!(d.x.abs() <= 0.2 && d.y.abs() <= 0.2 && d.z.abs() <= 0.2);
    }

    let curve_a = a.build().unwrap();
    let curve_b = b.build().unwrap();
    for i in 0..=20 {
        let t = f64::from(i) / 20.0;
        assert_eq!(curve_a.point_at(t), curve_b.point_at(t));
    }
}

#[test]
fn jitter_ignores_short_lists_and_zero_amplitude() {
    let mut pair = vec![Point3::ORIGIN, Point3::new(1.0, 1.0, 1.0)];
    let before = pair.clone();
    jitter_interior(&mut pair, 3, 1.0);
    assert_eq!(pair, before);

    let mut points = branch_points();
    jitter_interior(&mut points, 3, 0.0);
    assert_eq!(points, branch_points());
}

#[test]
fn quadratic_arch_lifts_midpoint() {
    let arch = QuadraticBezier3::arched(Point3::new(2.0, 0.0, 0.0), Point3::ORIGIN, 0.5);
    assert_eq!(arch.point_at(0.0), Point3::new(2.0, 0.0, 0.0));
    assert_eq!(arch.point_at(1.0), Point3::ORIGIN);
    // Peak of a quadratic arch is half the control lift.
    assert!((arch.point_at(0.5).y - 0.25).abs() < 1e-12);
    assert_eq!(arch.sample(30).len(), 31);
}

#[test]
fn cubic_bezier_analytic_derivative_matches_numeric() {
    let curve = CubicBezier3::new(
        Point3::new(4.0, 0.0, 0.0),
        Point3::new(3.0, 1.0, 0.5),
        Point3::new(1.0, 1.0, -0.5),
        Point3::new(0.0, 0.5, 0.0),
    );
    let t = 0.37;
    let h = 1e-6;
    let numeric = curve
        .point_at(t + h)
        .sub_point(curve.point_at(t - h))
        .mul_scalar(0.5 / h);
    assert!((numeric - curve.derivative_at(t)).length() < 1e-5);
}

#[test]
fn coincident_bezier_has_no_tangent_anywhere() {
    let p = Point3::new(1.0, 1.0, 1.0);
    let quadratic = QuadraticBezier3::new(p, p, p);
    let cubic = CubicBezier3::new(p, p, p, p);
    for i in 0..=20 {
        let t = f64::from(i) / 20.0;
        assert!(quadratic.tangent_at(t).is_none(), "quadratic framed at t = {t}");
        assert!(cubic.tangent_at(t).is_none(), "cubic framed at t = {t}");
    }

    let lifted = QuadraticBezier3::new(p, Point3::new(1.0, 1.5, 1.0), Point3::new(2.0, 1.0, 1.0));
    assert!(lifted.tangent_at(0.5).is_some());
}
