//! Core computation logic for the math node

use std::sync::Arc;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::nodes::value::{EnumDef, EnumValue};

/// Operations offered by the math node's `Op` input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Mod,
    Power,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    Equals,
    NotEqual,
    Minimum,
    Maximum,
    Average,
    Atan2,
    RandomR,
    ClampMax,
    ClampMin,
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRight,
    // Single argument, B is ignored
    Not,
    AbsoluteValue,
    Negative,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    ClampTo1,
}

impl MathOp {
    pub const ALL: [MathOp; 41] = [
        MathOp::Add,
        MathOp::Subtract,
        MathOp::Multiply,
        MathOp::Divide,
        MathOp::Mod,
        MathOp::Power,
        MathOp::GreaterThan,
        MathOp::GreaterEqual,
        MathOp::LessThan,
        MathOp::LessEqual,
        MathOp::Equals,
        MathOp::NotEqual,
        MathOp::Minimum,
        MathOp::Maximum,
        MathOp::Average,
        MathOp::Atan2,
        MathOp::RandomR,
        MathOp::ClampMax,
        MathOp::ClampMin,
        MathOp::And,
        MathOp::Or,
        MathOp::Xor,
        MathOp::ShiftLeft,
        MathOp::ShiftRight,
        MathOp::Not,
        MathOp::AbsoluteValue,
        MathOp::Negative,
        MathOp::Sqrt,
        MathOp::Sin,
        MathOp::Cos,
        MathOp::Tan,
        MathOp::Asin,
        MathOp::Acos,
        MathOp::Atan,
        MathOp::Sinh,
        MathOp::Cosh,
        MathOp::Tanh,
        MathOp::Asinh,
        MathOp::Acosh,
        MathOp::Atanh,
        MathOp::ClampTo1,
    ];

    /// Stable id written to files
    pub fn id(&self) -> &'static str {
        match self {
            MathOp::Add => "Add",
            MathOp::Subtract => "Subtract",
            MathOp::Multiply => "Multiply",
            MathOp::Divide => "Divide",
            MathOp::Mod => "Mod",
            MathOp::Power => "Power",
            MathOp::GreaterThan => "GreaterThan",
            MathOp::GreaterEqual => "GreaterEqual",
            MathOp::LessThan => "LessThan",
            MathOp::LessEqual => "LessEqual",
            MathOp::Equals => "Equals",
            MathOp::NotEqual => "NotEqual",
            MathOp::Minimum => "Minimum",
            MathOp::Maximum => "Maximum",
            MathOp::Average => "Average",
            MathOp::Atan2 => "Atan2",
            MathOp::RandomR => "RandomR",
            MathOp::ClampMax => "ClampMax",
            MathOp::ClampMin => "ClampMin",
            MathOp::And => "And",
            MathOp::Or => "Or",
            MathOp::Xor => "Xor",
            MathOp::ShiftLeft => "ShiftLeft",
            MathOp::ShiftRight => "ShiftRight",
            MathOp::Not => "Not",
            MathOp::AbsoluteValue => "AbsoluteValue",
            MathOp::Negative => "Negative",
            MathOp::Sqrt => "Sqrt",
            MathOp::Sin => "Sin",
            MathOp::Cos => "Cos",
            MathOp::Tan => "Tan",
            MathOp::Asin => "Asin",
            MathOp::Acos => "Acos",
            MathOp::Atan => "Atan",
            MathOp::Sinh => "Sinh",
            MathOp::Cosh => "Cosh",
            MathOp::Tanh => "Tanh",
            MathOp::Asinh => "Asinh",
            MathOp::Acosh => "Acosh",
            MathOp::Atanh => "Atanh",
            MathOp::ClampTo1 => "ClampTo1",
        }
    }

    /// Menu text
    pub fn label(&self) -> &'static str {
        match self {
            MathOp::GreaterThan => "Greater than",
            MathOp::GreaterEqual => "Greater or equal",
            MathOp::LessThan => "Less than",
            MathOp::LessEqual => "Less or equal",
            MathOp::NotEqual => "Not equal",
            MathOp::RandomR => "Random",
            MathOp::ClampMax => "Clamp max",
            MathOp::ClampMin => "Clamp min",
            MathOp::ShiftLeft => "Shift left",
            MathOp::ShiftRight => "Shift right",
            MathOp::AbsoluteValue => "Absolute value",
            MathOp::ClampTo1 => "Clamp to [0..1]",
            other => other.id(),
        }
    }

    /// Number of inputs the operation reads
    pub fn arity(&self) -> usize {
        if (*self as usize) < MathOp::Not as usize {
            2
        } else {
            1
        }
    }

    pub fn from_id(id: &str) -> Option<MathOp> {
        MathOp::ALL.into_iter().find(|op| op.id() == id)
    }

    /// Inverse of the enum field value stored in [`math_op_def`]
    pub fn from_value(value: i32) -> Option<MathOp> {
        usize::try_from(value).ok().and_then(|i| MathOp::ALL.get(i).copied())
    }

    pub fn enum_value(&self) -> EnumValue {
        EnumValue::new(math_op_def(), *self as usize)
    }
}

static MATH_OP_DEF: Lazy<Arc<EnumDef>> = Lazy::new(|| {
    let def = MathOp::ALL
        .into_iter()
        .fold(EnumDef::new("MathNodeDef"), |def, op| {
            def.with_field(op.id(), op.label(), op as i32)
        });
    Arc::new(def)
});

/// Shared definition of the `Op` enum
pub fn math_op_def() -> Arc<EnumDef> {
    MATH_OP_DEF.clone()
}

/// Apply `op` to `a` and `b`. Returns `None` when the inputs are outside
/// the operation's domain or the result is not finite.
pub fn compute(op: MathOp, a: f64, b: f64) -> Option<f64> {
    let truth = |t: bool| if t { 1.0 } else { 0.0 };
    let int = |v: f64| v.trunc() as i64;

    let result = match op {
        MathOp::Add => a + b,
        MathOp::Subtract => a - b,
        MathOp::Multiply => a * b,
        MathOp::Divide => {
            if b == 0.0 {
                return None;
            }
            a / b
        }
        MathOp::Mod => {
            if b == 0.0 {
                return None;
            }
            a - b * (a / b).trunc()
        }
        MathOp::Power => {
            // 0 to a negative power, or a negative base to a fractional one
            if (a == 0.0 && b < 0.0) || (a < 0.0 && b.fract() != 0.0) {
                return None;
            }
            a.powf(b)
        }
        MathOp::GreaterThan => truth(a > b),
        MathOp::GreaterEqual => truth(a >= b),
        MathOp::LessThan => truth(a < b),
        MathOp::LessEqual => truth(a <= b),
        MathOp::Equals => truth(a == b),
        MathOp::NotEqual => truth(a != b),
        MathOp::Minimum => a.min(b),
        MathOp::Maximum => a.max(b),
        MathOp::Average => (a + b) / 2.0,
        MathOp::Atan2 => a.atan2(b),
        MathOp::RandomR => {
            let mut rng = StdRng::seed_from_u64(int(a) as u64);
            b * rng.random::<f64>()
        }
        MathOp::ClampMax => a.min(b),
        MathOp::ClampMin => a.max(b),
        MathOp::And => (int(a) & int(b)) as f64,
        MathOp::Or => (int(a) | int(b)) as f64,
        MathOp::Xor => (int(a) ^ int(b)) as f64,
        MathOp::ShiftLeft | MathOp::ShiftRight => {
            let shift = int(b);
            if !(0..64).contains(&shift) {
                return None;
            }
            if op == MathOp::ShiftLeft {
                (int(a) << shift) as f64
            } else {
                (int(a) >> shift) as f64
            }
        }
        MathOp::Not => truth(a == 0.0),
        MathOp::AbsoluteValue => a.abs(),
        MathOp::Negative => -a,
        MathOp::Sqrt => {
            if a < 0.0 {
                return None;
            }
            a.sqrt()
        }
        MathOp::Sin => a.sin(),
        MathOp::Cos => a.cos(),
        MathOp::Tan => a.tan(),
        MathOp::Asin | MathOp::Acos => {
            if !(-1.0..=1.0).contains(&a) {
                return None;
            }
            if op == MathOp::Asin {
                a.asin()
            } else {
                a.acos()
            }
        }
        MathOp::Atan => a.atan(),
        MathOp::Sinh => a.sinh(),
        MathOp::Cosh => a.cosh(),
        MathOp::Tanh => a.tanh(),
        MathOp::Asinh => a.asinh(),
        MathOp::Acosh => {
            if a < 1.0 {
                return None;
            }
            a.acosh()
        }
        MathOp::Atanh => {
            if a <= -1.0 || a >= 1.0 {
                return None;
            }
            a.atanh()
        }
        MathOp::ClampTo1 => a.clamp(0.0, 1.0),
    };

    result.is_finite().then_some(result)
}
