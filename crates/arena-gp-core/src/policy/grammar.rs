use super::{Node, OperatorKind};
use crate::constants::CONSTANT_RANGE;
use crate::sensors::Feature;
use rand::Rng;

pub(crate) fn random_constant<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.random_range(-CONSTANT_RANGE..=CONSTANT_RANGE)
}

pub(crate) fn random_feature<R: Rng + ?Sized>(rng: &mut R) -> Feature {
    Feature::ALL[rng.random_range(0..Feature::ALL.len())]
}

fn boxed<R: Rng + ?Sized>(depth: usize, rng: &mut R) -> Box<Node> {
    Box::new(Node::random(depth, rng))
}

impl Node {
    /// Uniform over one constant slot plus every named feature.
    pub fn random_leaf<R: Rng + ?Sized>(rng: &mut R) -> Node {
        let pick = rng.random_range(0..=Feature::ALL.len());
        if pick == 0 {
            Node::constant(random_constant(rng))
        } else {
            Node::feature(Feature::ALL[pick - 1])
        }
    }

    /// Random tree whose depth never exceeds `depth`. Depth 0 is a single leaf.
    pub fn random<R: Rng + ?Sized>(depth: usize, rng: &mut R) -> Node {
        if depth == 0 {
            return Node::random_leaf(rng);
        }
        let kind = OperatorKind::ALL[rng.random_range(0..OperatorKind::ALL.len())];
        Node::random_with(kind, depth, rng)
    }

    /// Operator node of `kind` with children bounded by `depth - 1`.
    pub(crate) fn random_with<R: Rng + ?Sized>(
        kind: OperatorKind,
        depth: usize,
        rng: &mut R,
    ) -> Node {
        let sub = depth.saturating_sub(1);
        match kind {
            OperatorKind::Binary(op) => Node::Binary {
                op,
                left: boxed(sub, rng),
                right: boxed(sub, rng),
            },
            OperatorKind::Unary(op) => Node::Unary {
                op,
                child: boxed(sub, rng),
            },
            OperatorKind::Guard(op) => Node::Guard {
                op,
                condition: boxed(sub, rng),
                body: boxed(sub, rng),
            },
            OperatorKind::IfThenElse => Node::IfThenElse {
                condition: boxed(sub, rng),
                then: boxed(sub, rng),
                otherwise: boxed(sub, rng),
            },
            OperatorKind::GotoGoal => Node::random_goto_goal(depth, rng),
        }
    }

    /// While resources remain, run a fresh sub-policy; once none remain, head
    /// for the goal. Without room for the ternary wrapper the bare goto-goal
    /// node is emitted.
    fn random_goto_goal<R: Rng + ?Sized>(depth: usize, rng: &mut R) -> Node {
        if depth < 2 {
            return Node::GotoGoal {
                acceleration: boxed(0, rng),
                rotation: boxed(0, rng),
            };
        }
        let then = boxed(depth - 1, rng);
        let goto = Node::GotoGoal {
            acceleration: boxed(depth - 2, rng),
            rotation: boxed(depth - 2, rng),
        };
        Node::IfThenElse {
            condition: Box::new(Node::feature(Feature::ResourcesRemaining)),
            then,
            otherwise: Box::new(goto),
        }
    }

    /// Replace every operator sitting at `max_depth` with a fresh leaf so the
    /// tree depth is at most `max_depth`.
    pub fn truncate<R: Rng + ?Sized>(&mut self, max_depth: usize, rng: &mut R) {
        if self.is_leaf() {
            return;
        }
        if max_depth == 0 {
            *self = Node::random_leaf(rng);
            return;
        }
        for child in self.children_mut() {
            child.truncate(max_depth - 1, rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use proptest::prelude::*;

    #[test]
    fn depth_zero_is_a_leaf() {
        let mut rng = create_rng(3);
        for _ in 0..50 {
            assert!(Node::random(0, &mut rng).is_leaf());
        }
    }

    #[test]
    fn leaves_cover_constants_and_features() {
        let mut rng = create_rng(5);
        let mut constants = 0;
        let mut features = std::collections::HashSet::new();
        for _ in 0..2000 {
            match Node::random_leaf(&mut rng) {
                Node::Constant { value } => {
                    assert!((-CONSTANT_RANGE..=CONSTANT_RANGE).contains(&value));
                    constants += 1;
                }
                Node::Feature { feature } => {
                    features.insert(feature);
                }
                other => panic!("leaf expected, got {other:?}"),
            }
        }
        assert!(constants > 0);
        assert_eq!(features.len(), Feature::ALL.len());
    }

    #[test]
    fn goto_goal_is_wrapped_in_resource_ternary() {
        let mut rng = create_rng(9);
        let node = Node::random_with(OperatorKind::GotoGoal, 3, &mut rng);
        match node {
            Node::IfThenElse {
                condition,
                otherwise,
                ..
            } => {
                assert_eq!(*condition, Node::feature(Feature::ResourcesRemaining));
                assert!(matches!(*otherwise, Node::GotoGoal { .. }));
            }
            other => panic!("expected ternary, got {other:?}"),
        }
        let shallow = Node::random_with(OperatorKind::GotoGoal, 1, &mut rng);
        assert!(matches!(shallow, Node::GotoGoal { .. }));
        assert_eq!(shallow.depth(), 1);
    }

    #[test]
    fn truncate_bounds_depth() {
        let mut rng = create_rng(21);
        let mut node = Node::random(8, &mut rng);
        node.truncate(2, &mut rng);
        assert!(node.depth() <= 2);
        let mut leaf = Node::constant(1.0);
        leaf.truncate(0, &mut rng);
        assert_eq!(leaf, Node::constant(1.0));
    }

    proptest! {
        #[test]
        fn generated_depth_is_bounded(seed in any::<u64>(), depth in 0usize..7) {
            let mut rng = create_rng(seed);
            let node = Node::random(depth, &mut rng);
            prop_assert!(node.depth() <= depth);
        }
    }
}
