use crate::geom::{BBox, Bvh, Point3, Ray3, Vec3};

fn sphere_boxes(centers: &[Point3], radius: f64) -> Vec<BBox> {
    centers.iter().map(|c| BBox::from_sphere(*c, radius)).collect()
}

#[test]
fn bvh_query_bbox_returns_intersecting_primitives() {
    let bboxes = vec![
        BBox::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
        ),
        BBox::new(
            Point3::new(2.0, 2.0, 2.0),
            Point3::new(3.0, 3.0, 3.0),
        ),
        BBox::new(
            Point3::new(0.5, 0.5, 0.5),
            Point3::new(2.5, 2.5, 2.5),
        ),
    ];

    let bvh = Bvh::build_with_leaf_size(&bboxes, 1).expect("bvh build");
    let query = BBox::new(
        Point3::new(0.75, 0.75, 0.75),
        Point3::new(0.8, 0.8, 0.8),
    );

    let mut hits = Vec::new();
    bvh.query_bbox(query, |idx| {
        hits.push(idx);
        true
    });
    hits.sort_unstable();
    hits.dedup();

    assert_eq!(hits, vec![0, 2]);
}

#[test]
fn bvh_query_ray_returns_intersecting_primitives() {
    let bboxes = vec![
        BBox::new(
            Point3::new(0.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
        ),
        BBox::new(
            Point3::new(0.0, 2.0, -1.0),
            Point3::new(1.0, 3.0, 1.0),
        ),
        BBox::new(
            Point3::new(5.0, -0.5, -0.5),
            Point3::new(6.0, 0.5, 0.5),
        ),
    ];

    let bvh = Bvh::build_with_leaf_size(&bboxes, 1).expect("bvh build");

    let origin = Point3::new(-10.0, 0.0, 0.0);
    let dir = Vec3::new(1.0, 0.0, 0.0);

    let mut hits = Vec::new();
    bvh.query_ray(origin, dir, 0.0, f64::INFINITY, |idx| {
        hits.push(idx);
        true
    });
    hits.sort_unstable();
    hits.dedup();

    assert_eq!(hits, vec![0, 2]);
}

#[test]
fn bvh_closest_hit_prefers_nearest_sphere() {
    let centers = vec![
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(6.0, 0.0, 0.0),
        Point3::new(2.0, 5.0, 0.0),
    ];
    let radius = 0.5;
    let bvh = Bvh::build_with_leaf_size(&sphere_boxes(&centers, radius), 1).expect("bvh build");
    let ray = Ray3::new(Point3::new(-10.0, 0.0, 0.0), Vec3::X).expect("ray");

    let (idx, t) = bvh
        .closest_hit(ray, f64::INFINITY, |prim| ray.intersect_sphere(centers[prim], radius))
        .expect("hit");

    assert_eq!(idx, 1);
    assert!((t - 11.5).abs() < 1e-12);
}

#[test]
fn bvh_closest_hit_breaks_ties_by_index() {
    // Same sphere registered twice; the lower index wins regardless of traversal.
    let centers = vec![
        Point3::new(0.0, 0.0, -3.0),
        Point3::new(4.0, 0.0, -3.0),
        Point3::new(0.0, 0.0, -3.0),
    ];
    let bvh = Bvh::build_with_leaf_size(&sphere_boxes(&centers, 0.25), 1).expect("bvh build");
    let ray = Ray3::new(Point3::ORIGIN, Vec3::new(0.0, 0.0, -1.0)).expect("ray");

    let hit = bvh.closest_hit(ray, f64::INFINITY, |prim| ray.intersect_sphere(centers[prim], 0.25));
    assert_eq!(hit.map(|(idx, _)| idx), Some(0));
}

#[test]
fn bvh_closest_hit_respects_max_distance_and_misses() {
    let centers = vec![Point3::new(0.0, 0.0, -20.0)];
    let bvh = Bvh::build(&sphere_boxes(&centers, 1.0)).expect("bvh build");
    let ray = Ray3::new(Point3::ORIGIN, Vec3::new(0.0, 0.0, -1.0)).expect("ray");

    assert!(bvh
        .closest_hit(ray, 10.0, |prim| ray.intersect_sphere(centers[prim], 1.0))
        .is_none());

    let sideways = Ray3::new(Point3::ORIGIN, Vec3::X).expect("ray");
    assert!(bvh
        .closest_hit(sideways, f64::INFINITY, |prim| sideways.intersect_sphere(centers[prim], 1.0))
        .is_none());
}

#[test]
fn bvh_build_rejects_empty_input() {
    assert!(Bvh::build(&[]).is_none());
    let bvh = Bvh::build(&[BBox::from_sphere(Point3::ORIGIN, 1.0)]).expect("bvh build");
    assert_eq!(bvh.primitive_count(), 1);
}
