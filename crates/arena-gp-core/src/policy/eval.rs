use super::{BinaryOp, GuardOp, Node, UnaryOp};
use crate::sensors::SensorSnapshot;

/// Result of evaluating a subtree.
///
/// Most nodes yield a scalar. `GotoGoal` yields an (acceleration, rotation)
/// hint pair; scalar consumers take the first element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Scalar(f64),
    Pair(f64, f64),
}

impl Value {
    /// Scalar view: a pair collapses to its acceleration hint.
    pub fn scalar(self) -> f64 {
        match self {
            Value::Scalar(v) | Value::Pair(v, _) => v,
        }
    }

    /// Rotation view: a pair contributes its rotation hint.
    pub fn rotation(self) -> f64 {
        match self {
            Value::Scalar(v) | Value::Pair(_, v) => v,
        }
    }
}

fn truthy(v: f64) -> bool {
    v != 0.0
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl BinaryOp {
    /// Total over all inputs: division by zero yields 0.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
            BinaryOp::Max => a.max(b),
            BinaryOp::Min => a.min(b),
            BinaryOp::And => flag(truthy(a) && truthy(b)),
            BinaryOp::Or => flag(truthy(a) || truthy(b)),
        }
    }
}

impl UnaryOp {
    pub fn apply(self, a: f64) -> f64 {
        match self {
            UnaryOp::Abs => a.abs(),
            UnaryOp::Not => flag(!truthy(a)),
        }
    }
}

impl GuardOp {
    pub fn passes(self, condition: f64) -> bool {
        match self {
            GuardOp::IfPositive => condition > 0.0,
            GuardOp::IfNegative => condition < 0.0,
        }
    }
}

impl Node {
    /// Evaluate against a snapshot. Never fails; every operator is total.
    pub fn evaluate(&self, s: &SensorSnapshot) -> Value {
        match self {
            Node::Constant { value } => Value::Scalar(*value),
            Node::Feature { feature } => Value::Scalar(s.get(*feature)),
            Node::Unary { op, child } => Value::Scalar(op.apply(child.evaluate(s).scalar())),
            Node::Binary { op, left, right } => {
                let a = left.evaluate(s).scalar();
                let b = right.evaluate(s).scalar();
                Value::Scalar(op.apply(a, b))
            }
            Node::Guard {
                op,
                condition,
                body,
            } => {
                if op.passes(condition.evaluate(s).scalar()) {
                    body.evaluate(s)
                } else {
                    Value::Scalar(0.0)
                }
            }
            Node::IfThenElse {
                condition,
                then,
                otherwise,
            } => {
                if condition.evaluate(s).scalar() > 0.0 {
                    then.evaluate(s)
                } else {
                    otherwise.evaluate(s)
                }
            }
            Node::GotoGoal {
                acceleration,
                rotation,
            } => Value::Pair(
                s.goal_dir_x * acceleration.gain(),
                s.goal_bearing * rotation.gain(),
            ),
        }
    }

    /// Constant children scale the goto-goal hints; anything else is unit gain.
    fn gain(&self) -> f64 {
        match self {
            Node::Constant { value } => *value,
            _ => 1.0,
        }
    }
}
