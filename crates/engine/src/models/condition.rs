//! Rule conditions: a field from a fixed allow-list, an operator and an
//! optional comparison value.  Evaluation lives in [`crate::evaluator`].

use serde::{Deserialize, Serialize};

/// A boolean predicate over the event context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    /// Ignored by `is_empty` / `is_not_empty`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConditionValue>,
}

impl Condition {
    pub fn new(
        field: ConditionField,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        Self {
            field,
            operator,
            value: Some(value.into()),
        }
    }

    /// A condition whose operator takes no value.
    pub fn unary(field: ConditionField, operator: ConditionOperator) -> Self {
        Self {
            field,
            operator,
            value: None,
        }
    }
}

/// Context paths a condition may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionField {
    #[serde(rename = "task.title")]
    TaskTitle,
    #[serde(rename = "task.description")]
    TaskDescription,
    #[serde(rename = "task.assigneeId")]
    TaskAssigneeId,
    #[serde(rename = "task.dueDate")]
    TaskDueDate,
    #[serde(rename = "task.taskLabels")]
    TaskLabels,
    #[serde(rename = "task.archived")]
    TaskArchived,
    #[serde(rename = "list.name")]
    ListName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
}

/// Comparison value as written by the rule author.  Dates are RFC 3339
/// strings; their meaning depends on the field they are compared with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl From<&str> for ConditionValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for ConditionValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for ConditionValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for ConditionValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for ConditionValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}
