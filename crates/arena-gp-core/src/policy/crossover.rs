use super::Node;
use rand::Rng;

impl Node {
    /// Recombine `self` with `other`, keeping `self`'s shape.
    ///
    /// At every aligned position a uniform draw below `p_cut` takes the whole
    /// subtree from `other`. Otherwise, if both sides are operators, their
    /// children are recombined slot by slot; if either is a leaf, `self`'s
    /// subtree is kept. The ternary only pairs its branches with another
    /// ternary's branches; any other missing slot on the `other` side keeps
    /// `self`'s subtree.
    pub fn crossover<R: Rng + ?Sized>(&self, other: &Node, p_cut: f64, rng: &mut R) -> Node {
        cross(self, Some(other), p_cut, rng)
    }

    /// Positional child for alignment. A ternary exposes only its condition.
    fn slot(&self, index: usize) -> Option<&Node> {
        match self {
            Node::IfThenElse { condition, .. } => (index == 0).then_some(&**condition),
            other => other.children().get(index).copied(),
        }
    }
}

fn cross<R: Rng + ?Sized>(a: &Node, b: Option<&Node>, p_cut: f64, rng: &mut R) -> Node {
    let take_other = rng.random::<f64>() < p_cut;
    let Some(b) = b else {
        return a.clone();
    };
    if take_other {
        return b.clone();
    }
    if a.is_leaf() || b.is_leaf() {
        return a.clone();
    }
    let child = |x: &Node, y: Option<&Node>, rng: &mut R| Box::new(cross(x, y, p_cut, rng));
    match a {
        Node::Constant { .. } | Node::Feature { .. } => a.clone(),
        Node::Unary { op, child: c } => Node::Unary {
            op: *op,
            child: child(c, b.slot(0), rng),
        },
        Node::Binary { op, left, right } => Node::Binary {
            op: *op,
            left: child(left, b.slot(0), rng),
            right: child(right, b.slot(1), rng),
        },
        Node::Guard {
            op,
            condition,
            body,
        } => Node::Guard {
            op: *op,
            condition: child(condition, b.slot(0), rng),
            body: child(body, b.slot(1), rng),
        },
        Node::GotoGoal {
            acceleration,
            rotation,
        } => Node::GotoGoal {
            acceleration: child(acceleration, b.slot(0), rng),
            rotation: child(rotation, b.slot(1), rng),
        },
        Node::IfThenElse {
            condition,
            then,
            otherwise,
        } => {
            let (b_then, b_otherwise) = match b {
                Node::IfThenElse {
                    then, otherwise, ..
                } => (Some(&**then), Some(&**otherwise)),
                _ => (None, None),
            };
            Node::IfThenElse {
                condition: child(condition, b.slot(0), rng),
                then: child(then, b_then, rng),
                otherwise: child(otherwise, b_otherwise, rng),
            }
        }
    }
}
