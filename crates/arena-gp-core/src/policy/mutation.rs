use super::grammar::{random_constant, random_feature};
use super::{Node, OperatorKind};
use rand::Rng;

impl Node {
    /// Visit every node; each one mutates with probability `p`.
    ///
    /// Constants draw a new value, features a new name. Unary, binary and
    /// guard operators switch to a different operator from
    /// [`OperatorKind::SAFE`], keeping their children where the arity allows
    /// and filling a missing slot with a fresh leaf. The ternary and goto-goal
    /// keep their kind. Traversal continues into all children afterwards.
    pub fn mutate<R: Rng + ?Sized>(&mut self, p: f64, rng: &mut R) {
        if rng.random::<f64>() < p {
            self.mutate_here(rng);
        }
        for child in self.children_mut() {
            child.mutate(p, rng);
        }
    }

    fn mutate_here<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match self {
            Node::Constant { value } => *value = random_constant(rng),
            Node::Feature { feature } => *feature = random_feature(rng),
            Node::IfThenElse { .. } | Node::GotoGoal { .. } => {}
            Node::Unary { .. } | Node::Binary { .. } | Node::Guard { .. } => {
                let current = self.kind();
                let choices: Vec<OperatorKind> = OperatorKind::SAFE
                    .into_iter()
                    .filter(|k| Some(*k) != current)
                    .collect();
                let next = choices[rng.random_range(0..choices.len())];
                self.reshape(next, rng);
            }
        }
    }

    /// Rebuild this operator as `kind`, reusing existing children in order.
    fn reshape<R: Rng + ?Sized>(&mut self, kind: OperatorKind, rng: &mut R) {
        let old = std::mem::replace(self, Node::constant(0.0));
        let mut slots = old.into_children().into_iter();
        let mut next = |rng: &mut R| {
            slots
                .next()
                .unwrap_or_else(|| Box::new(Node::random_leaf(rng)))
        };
        *self = match kind {
            OperatorKind::Binary(op) => Node::Binary {
                op,
                left: next(rng),
                right: next(rng),
            },
            OperatorKind::Unary(op) => Node::Unary {
                op,
                child: next(rng),
            },
            OperatorKind::Guard(op) => Node::Guard {
                op,
                condition: next(rng),
                body: next(rng),
            },
            OperatorKind::IfThenElse => Node::IfThenElse {
                condition: next(rng),
                then: next(rng),
                otherwise: next(rng),
            },
            OperatorKind::GotoGoal => Node::GotoGoal {
                acceleration: next(rng),
                rotation: next(rng),
            },
        };
    }

    fn into_children(self) -> Vec<Box<Node>> {
        match self {
            Node::Constant { .. } | Node::Feature { .. } => Vec::new(),
            Node::Unary { child, .. } => vec![child],
            Node::Binary { left, right, .. } => vec![left, right],
            Node::Guard {
                condition, body, ..
            } => vec![condition, body],
            Node::IfThenElse {
                condition,
                then,
                otherwise,
            } => vec![condition, then, otherwise],
            Node::GotoGoal {
                acceleration,
                rotation,
            } => vec![acceleration, rotation],
        }
    }
}
