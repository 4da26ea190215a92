//! Bounding volume hierarchy over axis-aligned boxes.
//!
//! Picking rebuilds one of these per target sync; primitives are the boxes
//! around each interactive node's bounding sphere.

use super::{BBox, Point3, Ray3, Vec3};

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bbox: BBox,
    left: u32,
    right: u32,
    start: u32,
    count: u32,
}

impl BvhNode {
    const fn leaf(bbox: BBox, start: u32, count: u32) -> Self {
        Self {
            bbox,
            left: u32::MAX,
            right: u32::MAX,
            start,
            count,
        }
    }

    const fn inner(bbox: BBox, left: u32, right: u32) -> Self {
        Self {
            bbox,
            left,
            right,
            start: 0,
            count: 0,
        }
    }

    const fn is_leaf(self) -> bool {
        self.count != 0
    }
}

#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    prim_indices: Vec<u32>,
}

impl Bvh {
    const DEFAULT_LEAF_SIZE: usize = 4;

    #[must_use]
    pub fn build(bboxes: &[BBox]) -> Option<Self> {
        Self::build_with_leaf_size(bboxes, Self::DEFAULT_LEAF_SIZE)
    }

    #[must_use]
    pub fn build_with_leaf_size(bboxes: &[BBox], leaf_size: usize) -> Option<Self> {
        if bboxes.is_empty() {
            return None;
        }

        let leaf_size = leaf_size.clamp(1, 256);
        let prim_indices: Vec<u32> = (0..(bboxes.len() as u32)).collect();
        let nodes = Vec::with_capacity(bboxes.len().saturating_mul(2));

        let mut bvh = Self { nodes, prim_indices };
        bvh.build_node(bboxes, 0, bboxes.len(), leaf_size);
        Some(bvh)
    }

    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.prim_indices.len()
    }

    fn build_node(&mut self, bboxes: &[BBox], start: usize, end: usize, leaf_size: usize) -> u32 {
        let node_index = self.nodes.len() as u32;
        let bbox = self.range_bbox(bboxes, start, end);
        self.nodes.push(BvhNode::leaf(bbox, 0, 0));

        let count = end - start;
        if count <= leaf_size {
            self.nodes[node_index as usize] = BvhNode::leaf(bbox, start as u32, count as u32);
            return node_index;
        }

        let axis = self.choose_split_axis(bboxes, start, end);
        let mid = start + count / 2;
        self.prim_indices[start..end].select_nth_unstable_by(mid - start, |a, b| {
            let ca = centroid_component(bboxes[*a as usize], axis);
            let cb = centroid_component(bboxes[*b as usize], axis);
            ca.total_cmp(&cb)
        });

        let left = self.build_node(bboxes, start, mid, leaf_size);
        let right = self.build_node(bboxes, mid, end, leaf_size);
        self.nodes[node_index as usize] = BvhNode::inner(bbox, left, right);
        node_index
    }

    fn range_bbox(&self, bboxes: &[BBox], start: usize, end: usize) -> BBox {
        self.prim_indices[(start + 1)..end]
            .iter()
            .fold(bboxes[self.prim_indices[start] as usize], |acc, &idx| {
                acc.union(bboxes[idx as usize])
            })
    }

    fn choose_split_axis(&self, bboxes: &[BBox], start: usize, end: usize) -> u8 {
        let first = bboxes[self.prim_indices[start] as usize].center();
        let extent = self.prim_indices[(start + 1)..end]
            .iter()
            .fold(BBox::new(first, first), |acc, &idx| {
                acc.expand_point(bboxes[idx as usize].center())
            })
            .size();

        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }

    /// Visits every primitive whose box overlaps `query`; stop by returning `false`.
    pub fn query_bbox<F>(&self, query: BBox, mut visit: F)
    where
        F: FnMut(usize) -> bool,
    {
        self.traverse(|bbox| bbox.intersects(query), &mut visit);
    }

    /// Visits every primitive whose box is crossed by the ray within `[t_min, t_max]`.
    pub fn query_ray<F>(&self, origin: Point3, dir: Vec3, t_min: f64, t_max: f64, mut visit: F)
    where
        F: FnMut(usize) -> bool,
    {
        self.traverse(
            |bbox| ray_intersects_bbox(origin, dir, bbox, t_min, t_max),
            &mut visit,
        );
    }

    /// Closest primitive hit along `ray`, using `hit` for the exact test.
    ///
    /// Ties on distance resolve to the lower primitive index so results do not
    /// depend on traversal order.
    pub fn closest_hit<F>(&self, ray: Ray3, t_max: f64, mut hit: F) -> Option<(usize, f64)>
    where
        F: FnMut(usize) -> Option<f64>,
    {
        let mut best: Option<(usize, f64)> = None;
        self.query_ray(ray.origin, ray.dir, 0.0, t_max, |prim| {
            if let Some(t) = hit(prim).filter(|t| t.is_finite() && *t <= t_max) {
                let better = match best {
                    None => true,
                    Some((best_prim, best_t)) => t < best_t || (t == best_t && prim < best_prim),
                };
                if better {
                    best = Some((prim, t));
                }
            }
            true
        });
        best
    }

    fn traverse<P, F>(&self, mut accept: P, visit: &mut F)
    where
        P: FnMut(BBox) -> bool,
        F: FnMut(usize) -> bool,
    {
        let mut stack = vec![0u32];
        while let Some(node_idx) = stack.pop() {
            let node = self.nodes[node_idx as usize];
            if !accept(node.bbox) {
                continue;
            }

            if node.is_leaf() {
                let start = node.start as usize;
                let end = start + node.count as usize;
                for &prim in &self.prim_indices[start..end] {
                    if !visit(prim as usize) {
                        return;
                    }
                }
                continue;
            }

            stack.push(node.left);
            stack.push(node.right);
        }
    }
}

fn centroid_component(bbox: BBox, axis: u8) -> f64 {
    let c = bbox.center();
    match axis {
        0 => c.x,
        1 => c.y,
        _ => c.z,
    }
}

fn ray_intersects_bbox(origin: Point3, dir: Vec3, bbox: BBox, t_min: f64, t_max: f64) -> bool {
    let mut tmin = t_min;
    let mut tmax = t_max;
    let eps = 1e-15;

    for axis in 0..3u8 {
        let (o, d, min, max) = match axis {
            0 => (origin.x, dir.x, bbox.min.x, bbox.max.x),
            1 => (origin.y, dir.y, bbox.min.y, bbox.max.y),
            _ => (origin.z, dir.z, bbox.min.z, bbox.max.z),
        };

        if !o.is_finite() || !d.is_finite() {
            return false;
        }

        if d.abs() <= eps {
            if o < min || o > max {
                return false;
            }
            continue;
        }

        let inv_d = 1.0 / d;
        let mut t0 = (min - o) * inv_d;
        let mut t1 = (max - o) * inv_d;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }

        tmin = tmin.max(t0);
        tmax = tmax.min(t1);
        if tmax < tmin {
            return false;
        }
    }

    true
}
