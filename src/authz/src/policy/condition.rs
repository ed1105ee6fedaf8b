//! Condition expression tree
//!
//! Conditions are a closed set of operators tagged by `op` in the JSON form:
//!
//! ```json
//! { "op": "and", "args": [
//!     { "op": "eq", "left": { "ref": "principal.attrs.department" }, "right": "eng" },
//!     { "op": "matches", "text": { "ref": "resource.attrs.path" }, "regex": "^/public/" }
//! ] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Boolean condition tree evaluated against principal, resource and context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Condition {
    And { args: Vec<Condition> },
    Or { args: Vec<Condition> },
    Not { arg: Box<Condition> },
    Eq { left: Operand, right: Operand },
    Ne { left: Operand, right: Operand },
    Gt { left: Operand, right: Operand },
    Gte { left: Operand, right: Operand },
    Lt { left: Operand, right: Operand },
    Lte { left: Operand, right: Operand },
    In { item: Operand, set: Operand },
    Contains { text: Operand, value: Operand },
    Matches { text: Operand, regex: String },
}

impl Condition {
    pub fn and(args: Vec<Condition>) -> Self {
        Condition::And { args }
    }

    pub fn or(args: Vec<Condition>) -> Self {
        Condition::Or { args }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(arg: Condition) -> Self {
        Condition::Not { arg: Box::new(arg) }
    }

    pub fn eq(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Condition::Eq {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn ne(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Condition::Ne {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn gt(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Condition::Gt {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn gte(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Condition::Gte {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn lt(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Condition::Lt {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn lte(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Condition::Lte {
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn is_in(item: impl Into<Operand>, set: impl Into<Operand>) -> Self {
        Condition::In {
            item: item.into(),
            set: set.into(),
        }
    }

    pub fn contains(text: impl Into<Operand>, value: impl Into<Operand>) -> Self {
        Condition::Contains {
            text: text.into(),
            value: value.into(),
        }
    }

    pub fn matches(text: impl Into<Operand>, regex: impl Into<String>) -> Self {
        Condition::Matches {
            text: text.into(),
            regex: regex.into(),
        }
    }
}

/// Dot-path reference into the evaluation input, e.g. `principal.attrs.department`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    #[serde(rename = "ref")]
    pub path: String,
}

/// Condition operand: a reference, a list of operands, or a literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Ref(Ref),
    List(Vec<Operand>),
    Literal(Value),
}

impl Operand {
    pub fn reference(path: impl Into<String>) -> Self {
        Operand::Ref(Ref { path: path.into() })
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Operand::Literal(Value::String(value))
    }
}

macro_rules! numeric_operand {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Literal(Value::from(value))
                }
            }
        )*
    };
}

numeric_operand!(i32, i64, u32, u64, f64);

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Literal(Value::Bool(value))
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Literal(value)
    }
}

impl<T: Into<Operand>> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}
