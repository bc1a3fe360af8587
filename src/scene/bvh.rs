use index_vec::IndexVec;
use ordered_float::OrderedFloat;

use crate::geometry::{Aabb, FloatType, Ray, TexturePoint};

use super::{Primitive, PrimitiveIdx};

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
}

#[derive(Debug)]
enum Node {
    Leaf {
        aabb: Aabb,
        primitive: PrimitiveIdx,
    },
    Inner {
        aabb: Aabb,
        left: NodeIdx,
        right: NodeIdx,
    },
}

impl Node {
    fn aabb(&self) -> &Aabb {
        match self {
            Node::Leaf { aabb, .. } => aabb,
            Node::Inner { aabb, .. } => aabb,
        }
    }
}

/// Median-split bounding volume hierarchy over the scene's primitive
/// arena. Nodes live in their own arena; leaves hold exactly one
/// primitive. Immutable once built.
#[derive(Debug)]
pub struct Bvh {
    nodes: IndexVec<NodeIdx, Node>,
    root: NodeIdx,
}

impl Bvh {
    pub fn build(primitives: &IndexVec<PrimitiveIdx, Primitive>) -> Bvh {
        assert!(!primitives.is_empty());
        let mut ordering: Vec<PrimitiveIdx> = primitives.indices().collect();
        let mut nodes = IndexVec::with_capacity(2 * primitives.len() - 1);
        let root = build_node(&mut nodes, primitives, &mut ordering);
        Bvh { nodes, root }
    }

    /// Nearest crossing past `t_min`, if any.
    pub fn intersect(
        &self,
        primitives: &IndexVec<PrimitiveIdx, Primitive>,
        ray: &Ray,
        t_min: FloatType,
    ) -> Option<(FloatType, TexturePoint, PrimitiveIdx)> {
        self.intersect_node(self.root, primitives, ray, t_min)
    }

    fn intersect_node(
        &self,
        node: NodeIdx,
        primitives: &IndexVec<PrimitiveIdx, Primitive>,
        ray: &Ray,
        t_min: FloatType,
    ) -> Option<(FloatType, TexturePoint, PrimitiveIdx)> {
        if !self.nodes[node].aabb().intersect(ray) {
            return None;
        }
        match self.nodes[node] {
            Node::Leaf { primitive, .. } => primitives[primitive]
                .intersect(ray, t_min)
                .map(|(t, uv)| (t, uv, primitive)),
            Node::Inner { left, right, .. } => {
                // Both subtrees are tested unconditionally; there is no
                // front-to-back ordering.
                let hit_left = self.intersect_node(left, primitives, ray, t_min);
                let hit_right = self.intersect_node(right, primitives, ray, t_min);
                match (hit_left, hit_right) {
                    (Some(l), Some(r)) => Some(if l.0 <= r.0 { l } else { r }),
                    (hit, None) | (None, hit) => hit,
                }
            }
        }
    }
}

fn build_node(
    nodes: &mut IndexVec<NodeIdx, Node>,
    primitives: &IndexVec<PrimitiveIdx, Primitive>,
    ordering: &mut [PrimitiveIdx],
) -> NodeIdx {
    if let [primitive] = *ordering {
        return nodes.push(Node::Leaf {
            aabb: primitives[primitive].bounding_box(),
            primitive,
        });
    }

    // Split axis comes from the box around the centroids, not around the
    // primitives themselves.
    let centroid_box = ordering
        .iter()
        .fold(Aabb::default(), |aabb, &idx| {
            aabb + primitives[idx].bounding_box().centroid()
        });
    let axis = centroid_box.largest_axis();
    ordering.sort_unstable_by_key(|&idx| {
        OrderedFloat(primitives[idx].bounding_box().centroid()[axis])
    });

    let (front, back) = ordering.split_at_mut(ordering.len() / 2);
    let left = build_node(nodes, primitives, front);
    let right = build_node(nodes, primitives, back);
    let aabb = *nodes[left].aabb() + *nodes[right].aabb();
    nodes.push(Node::Inner { aabb, left, right })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::test::{nonzero_vector, world_point};
    use crate::geometry::{WorldPoint, WorldVector};
    use crate::scene::MaterialIdx;
    use crate::scene::primitives::{Sphere, Triangle};
    use assert2::assert;
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn linear_scan(
        primitives: &IndexVec<PrimitiveIdx, Primitive>,
        ray: &Ray,
        t_min: FloatType,
    ) -> Option<(FloatType, PrimitiveIdx)> {
        primitives
            .iter_enumerated()
            .filter_map(|(idx, primitive)| {
                primitive.intersect(ray, t_min).map(|(t, _)| (t, idx))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn primitive_strategy() -> BoxedStrategy<Primitive> {
        prop_oneof![
            (world_point(), 0.1f32..5.0).prop_map(|(center, radius)| {
                Primitive::Sphere(Sphere {
                    center,
                    radius,
                    material: MaterialIdx::new(0),
                })
            }),
            (world_point(), world_point(), world_point()).prop_map(|(a, b, c)| {
                Primitive::Triangle(Triangle::new([a, b, c], MaterialIdx::new(0)))
            }),
        ]
        .boxed()
    }

    #[proptest]
    fn matches_linear_scan(
        #[strategy(proptest::collection::vec(primitive_strategy(), 1..24))]
        primitive_list: Vec<Primitive>,
        #[strategy(world_point())] origin: WorldPoint,
        #[strategy(nonzero_vector())] direction: WorldVector,
    ) {
        let primitives: IndexVec<PrimitiveIdx, Primitive> =
            primitive_list.into_iter().collect();
        let bvh = Bvh::build(&primitives);
        let ray = Ray::new(origin, direction);

        let expected = linear_scan(&primitives, &ray, 0.0);
        let actual = bvh.intersect(&primitives, &ray, 0.0);

        match (expected, actual) {
            (None, None) => {}
            (Some((t_lin, _)), Some((t_bvh, _, _))) => {
                // Ties between touching primitives may resolve to either
                // one; the reported distance must agree.
                prop_assert!((t_lin - t_bvh).abs() < 1e-4 * (1.0 + t_lin.abs()));
            }
            (expected, actual) => {
                prop_assert!(false, "expected {expected:?}, got {actual:?}");
            }
        }
    }

    #[test]
    fn single_primitive_tree() {
        let primitives: IndexVec<PrimitiveIdx, Primitive> =
            std::iter::once(Primitive::Sphere(Sphere {
                center: WorldPoint::new(0.0, 0.0, 5.0),
                radius: 1.0,
                material: MaterialIdx::new(0),
            }))
            .collect();
        let bvh = Bvh::build(&primitives);

        let hit_ray = Ray::new(WorldPoint::origin(), WorldVector::new(0.01, 0.01, 1.0));
        let (t, _, idx) = bvh.intersect(&primitives, &hit_ray, 0.0).unwrap();
        assert!(idx == PrimitiveIdx::new(0));
        assert!((t - 4.0).abs() < 0.01);

        let miss_ray = Ray::new(WorldPoint::origin(), WorldVector::new(0.01, 0.01, -1.0));
        assert!(bvh.intersect(&primitives, &miss_ray, 0.0).is_none());
    }

    /// The box test must not discard rays with zero direction
    /// components, or the tree drops primitives sitting dead ahead.
    #[test]
    fn axis_aligned_ray_hits_sphere_dead_ahead() {
        let primitives: IndexVec<PrimitiveIdx, Primitive> =
            std::iter::once(Primitive::Sphere(Sphere {
                center: WorldPoint::new(0.0, 0.0, 5.0),
                radius: 1.0,
                material: MaterialIdx::new(0),
            }))
            .collect();
        let bvh = Bvh::build(&primitives);
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(0.0, 0.0, 1.0));

        let (t, _, idx) = bvh.intersect(&primitives, &ray, 0.0).unwrap();
        assert!(idx == PrimitiveIdx::new(0));
        assert!((t - 4.0).abs() < 1e-6);
    }

    #[test]
    fn respects_t_min() {
        let primitives: IndexVec<PrimitiveIdx, Primitive> = [
            Primitive::Sphere(Sphere {
                center: WorldPoint::new(0.0, 0.0, 2.0),
                radius: 1.0,
                material: MaterialIdx::new(0),
            }),
            Primitive::Sphere(Sphere {
                center: WorldPoint::new(0.0, 0.0, 10.0),
                radius: 1.0,
                material: MaterialIdx::new(0),
            }),
        ]
        .into_iter()
        .collect();
        let bvh = Bvh::build(&primitives);
        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(0.001, 0.001, 1.0));

        // Past both crossings of the first sphere the far one is next.
        let (t, _, idx) = bvh.intersect(&primitives, &ray, 4.0).unwrap();
        assert!(idx == PrimitiveIdx::new(1));
        assert!((t - 9.0).abs() < 0.01);
    }
}
