//! Expression-tree policies.
//!
//! A [`Policy`] is a pair of independent trees, one producing acceleration and
//! one producing rotation, over the same grammar. Operators own their children
//! (`Box<Node>`), so every tree is acyclic and every clone is a deep copy;
//! offspring never alias their parents.
//!
//! Evaluation, random generation, mutation, crossover and persistence live in
//! sibling modules as `impl` blocks on [`Node`] / [`Policy`].

mod crossover;
mod document;
mod eval;
mod grammar;
mod mutation;

pub use document::PolicyError;
pub use eval::Value;

use crate::agent::Control;
use crate::sensors::{Feature, SensorSnapshot};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "max")]
    Max,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Abs,
    Not,
}

/// Sign-test conditionals: evaluate the body only when the condition passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardOp {
    IfPositive,
    IfNegative,
}

/// Operator choice without children, used by generation and mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Binary(BinaryOp),
    Unary(UnaryOp),
    Guard(GuardOp),
    IfThenElse,
    GotoGoal,
}

impl OperatorKind {
    /// Full grammar; random construction draws uniformly from this list.
    pub const ALL: [OperatorKind; 14] = [
        OperatorKind::Binary(BinaryOp::Add),
        OperatorKind::Binary(BinaryOp::Sub),
        OperatorKind::Binary(BinaryOp::Mul),
        OperatorKind::Binary(BinaryOp::Div),
        OperatorKind::Binary(BinaryOp::Max),
        OperatorKind::Binary(BinaryOp::Min),
        OperatorKind::Unary(UnaryOp::Abs),
        OperatorKind::Guard(GuardOp::IfPositive),
        OperatorKind::Guard(GuardOp::IfNegative),
        OperatorKind::Binary(BinaryOp::And),
        OperatorKind::Binary(BinaryOp::Or),
        OperatorKind::Unary(UnaryOp::Not),
        OperatorKind::IfThenElse,
        OperatorKind::GotoGoal,
    ];

    /// Replacement set for point mutation. Never produces the ternary or the
    /// composite, whose child layout cannot be derived from another operator.
    pub const SAFE: [OperatorKind; 9] = [
        OperatorKind::Binary(BinaryOp::Add),
        OperatorKind::Binary(BinaryOp::Sub),
        OperatorKind::Binary(BinaryOp::Mul),
        OperatorKind::Binary(BinaryOp::Div),
        OperatorKind::Binary(BinaryOp::Max),
        OperatorKind::Binary(BinaryOp::Min),
        OperatorKind::Unary(UnaryOp::Abs),
        OperatorKind::Guard(GuardOp::IfPositive),
        OperatorKind::Guard(GuardOp::IfNegative),
    ];
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Constant {
        value: f64,
    },
    Feature {
        feature: Feature,
    },
    Unary {
        op: UnaryOp,
        child: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Guard {
        op: GuardOp,
        condition: Box<Node>,
        body: Box<Node>,
    },
    IfThenElse {
        condition: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    /// Steers straight at the goal. Constant children act as gains.
    GotoGoal {
        acceleration: Box<Node>,
        rotation: Box<Node>,
    },
}

impl Node {
    pub fn constant(value: f64) -> Self {
        Node::Constant { value }
    }

    pub fn feature(feature: Feature) -> Self {
        Node::Feature { feature }
    }

    pub fn unary(op: UnaryOp, child: Node) -> Self {
        Node::Unary {
            op,
            child: Box::new(child),
        }
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn guard(op: GuardOp, condition: Node, body: Node) -> Self {
        Node::Guard {
            op,
            condition: Box::new(condition),
            body: Box::new(body),
        }
    }

    pub fn if_then_else(condition: Node, then: Node, otherwise: Node) -> Self {
        Node::IfThenElse {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn goto_goal(acceleration: Node, rotation: Node) -> Self {
        Node::GotoGoal {
            acceleration: Box::new(acceleration),
            rotation: Box::new(rotation),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Constant { .. } | Node::Feature { .. })
    }

    /// Operator kind of this node, `None` for leaves.
    pub fn kind(&self) -> Option<OperatorKind> {
        match self {
            Node::Constant { .. } | Node::Feature { .. } => None,
            Node::Unary { op, .. } => Some(OperatorKind::Unary(*op)),
            Node::Binary { op, .. } => Some(OperatorKind::Binary(*op)),
            Node::Guard { op, .. } => Some(OperatorKind::Guard(*op)),
            Node::IfThenElse { .. } => Some(OperatorKind::IfThenElse),
            Node::GotoGoal { .. } => Some(OperatorKind::GotoGoal),
        }
    }

    /// Children in slot order (the ternary lists condition, then, otherwise).
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Constant { .. } | Node::Feature { .. } => Vec::new(),
            Node::Unary { child, .. } => vec![&**child],
            Node::Binary { left, right, .. } => vec![&**left, &**right],
            Node::Guard {
                condition, body, ..
            } => vec![&**condition, &**body],
            Node::IfThenElse {
                condition,
                then,
                otherwise,
            } => vec![&**condition, &**then, &**otherwise],
            Node::GotoGoal {
                acceleration,
                rotation,
            } => vec![&**acceleration, &**rotation],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Vec<&mut Node> {
        match self {
            Node::Constant { .. } | Node::Feature { .. } => Vec::new(),
            Node::Unary { child, .. } => vec![&mut **child],
            Node::Binary { left, right, .. } => vec![&mut **left, &mut **right],
            Node::Guard {
                condition, body, ..
            } => vec![&mut **condition, &mut **body],
            Node::IfThenElse {
                condition,
                then,
                otherwise,
            } => vec![&mut **condition, &mut **then, &mut **otherwise],
            Node::GotoGoal {
                acceleration,
                rotation,
            } => vec![&mut **acceleration, &mut **rotation],
        }
    }

    /// Leaves have depth 0.
    pub fn depth(&self) -> usize {
        self.children()
            .into_iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Total node count.
    pub fn size(&self) -> usize {
        1 + self.children().into_iter().map(Node::size).sum::<usize>()
    }

    fn hash_structure<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Node::Constant { value } => value.to_bits().hash(state),
            Node::Feature { feature } => feature.hash(state),
            other => other.kind().hash(state),
        }
        for child in self.children() {
            child.hash_structure(state);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub acceleration_tree: Node,
    pub rotation_tree: Node,
}

impl Policy {
    pub fn new(acceleration_tree: Node, rotation_tree: Node) -> Self {
        Self {
            acceleration_tree,
            rotation_tree,
        }
    }

    /// Two independently generated trees bounded by `depth`.
    pub fn random<R: Rng + ?Sized>(depth: usize, rng: &mut R) -> Self {
        let acceleration_tree = Node::random(depth, rng);
        let rotation_tree = Node::random(depth, rng);
        Self::new(acceleration_tree, rotation_tree)
    }

    /// Evaluate both trees and clamp to actuator limits.
    ///
    /// A `Pair` from the acceleration tree contributes its acceleration hint; a
    /// `Pair` from the rotation tree contributes its rotation hint.
    pub fn control(&self, snapshot: &SensorSnapshot) -> Control {
        let acceleration = self.acceleration_tree.evaluate(snapshot).scalar();
        let rotation = self.rotation_tree.evaluate(snapshot).rotation();
        Control::clamped(acceleration, rotation)
    }

    /// Per-node point mutation on both trees, in place.
    pub fn mutate<R: Rng + ?Sized>(&mut self, probability: f64, rng: &mut R) {
        self.acceleration_tree.mutate(probability, rng);
        self.rotation_tree.mutate(probability, rng);
    }

    /// Child whose trees recombine `self` (shape donor) with `other`.
    pub fn crossover<R: Rng + ?Sized>(&self, other: &Policy, p_cut: f64, rng: &mut R) -> Policy {
        Policy::new(
            self.acceleration_tree
                .crossover(&other.acceleration_tree, p_cut, rng),
            self.rotation_tree.crossover(&other.rotation_tree, p_cut, rng),
        )
    }

    /// Replace subtrees below `max_depth` with fresh leaves.
    pub fn truncate<R: Rng + ?Sized>(&mut self, max_depth: usize, rng: &mut R) {
        self.acceleration_tree.truncate(max_depth, rng);
        self.rotation_tree.truncate(max_depth, rng);
    }

    pub fn depth(&self) -> usize {
        self.acceleration_tree
            .depth()
            .max(self.rotation_tree.depth())
    }

    pub fn size(&self) -> usize {
        self.acceleration_tree.size() + self.rotation_tree.size()
    }

    /// Structural hash: equal for policies that evaluate identically by construction.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.acceleration_tree.hash_structure(&mut hasher);
        self.rotation_tree.hash_structure(&mut hasher);
        hasher.finish()
    }
}
