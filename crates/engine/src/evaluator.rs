//! Condition evaluation: a pure function of the event context.
//!
//! Conditions are AND-combined and an empty list passes.  Every comparison
//! is total: a missing field, a type mismatch or an unparsable value makes
//! the condition false instead of raising an error, so a malformed
//! condition can only ever cause a rule to be skipped.

use std::collections::BTreeSet;

use board::Label;
use chrono::{DateTime, Utc};

use crate::models::{Condition, ConditionField, ConditionOperator, ConditionValue, EventContext};

/// `true` iff every condition holds for `context`.
pub fn evaluate(conditions: &[Condition], context: &EventContext) -> bool {
    conditions.iter().all(|c| evaluate_condition(c, context))
}

pub fn evaluate_condition(condition: &Condition, context: &EventContext) -> bool {
    let field = resolve(condition.field, context);
    let value = condition.value.as_ref();

    match condition.operator {
        ConditionOperator::Equals => equals(&field, value),
        ConditionOperator::NotEquals => !equals(&field, value),
        ConditionOperator::Contains => contains(&field, value),
        ConditionOperator::NotContains => !contains(&field, value),
        ConditionOperator::IsEmpty => is_empty(&field),
        ConditionOperator::IsNotEmpty => !is_empty(&field),
        ConditionOperator::GreaterThan => {
            compare(&field, value).is_some_and(|o| o == std::cmp::Ordering::Greater)
        }
        ConditionOperator::LessThan => {
            compare(&field, value).is_some_and(|o| o == std::cmp::Ordering::Less)
        }
    }
}

// ---------------------------------------------------------------------------
// Field resolution
// ---------------------------------------------------------------------------

/// A context value, typed by the field it was read from.
#[derive(Debug)]
enum Resolved<'a> {
    /// Absent strings resolve to `""`.
    Text(&'a str),
    Bool(bool),
    Date(Option<DateTime<Utc>>),
    Labels(&'a [Label]),
}

fn resolve(field: ConditionField, context: &EventContext) -> Resolved<'_> {
    let task = context.task.as_ref();
    match field {
        ConditionField::TaskTitle => Resolved::Text(task.map_or("", |t| t.title.as_str())),
        ConditionField::TaskDescription => {
            Resolved::Text(task.and_then(|t| t.description.as_deref()).unwrap_or(""))
        }
        ConditionField::TaskAssigneeId => {
            Resolved::Text(task.and_then(|t| t.assignee_id.as_deref()).unwrap_or(""))
        }
        ConditionField::TaskDueDate => Resolved::Date(task.and_then(|t| t.due_date)),
        ConditionField::TaskLabels => {
            Resolved::Labels(task.map(|t| t.labels.as_slice()).unwrap_or(&[]))
        }
        ConditionField::TaskArchived => task.map_or(Resolved::Text(""), |t| Resolved::Bool(t.archived)),
        ConditionField::ListName => {
            Resolved::Text(context.list.as_ref().map_or("", |l| l.name.as_str()))
        }
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

fn equals(field: &Resolved<'_>, value: Option<&ConditionValue>) -> bool {
    match field {
        Resolved::Text(s) => normalize(value).is_some_and(|v| v == *s),
        Resolved::Bool(b) => normalize(value).is_some_and(|v| v == b.to_string()),
        Resolved::Date(None) => normalize(value).is_some_and(|v| v.is_empty()),
        Resolved::Date(Some(due)) => parse_instant(value).is_some_and(|v| v == *due),
        Resolved::Labels(labels) => {
            let Some(wanted) = value_set(value) else {
                return false;
            };
            let names: BTreeSet<&str> = labels.iter().map(|l| l.name.as_str()).collect();
            let ids: BTreeSet<&str> = labels.iter().map(|l| l.id.as_str()).collect();
            wanted == names || wanted == ids
        }
    }
}

fn contains(field: &Resolved<'_>, value: Option<&ConditionValue>) -> bool {
    match field {
        Resolved::Labels(labels) => {
            let Some(wanted) = value_set(value) else {
                return false;
            };
            !wanted.is_empty()
                && wanted
                    .iter()
                    .all(|w| labels.iter().any(|l| l.name == *w || l.id == *w))
        }
        Resolved::Text(s) => normalize(value).is_some_and(|needle| s.contains(needle.as_str())),
        Resolved::Bool(b) => normalize(value).is_some_and(|needle| b.to_string().contains(&needle)),
        Resolved::Date(due) => {
            let haystack = due.map(|d| d.to_rfc3339()).unwrap_or_default();
            normalize(value).is_some_and(|needle| haystack.contains(&needle))
        }
    }
}

fn is_empty(field: &Resolved<'_>) -> bool {
    match field {
        Resolved::Text(s) => s.is_empty(),
        Resolved::Bool(_) => false,
        Resolved::Date(due) => due.is_none(),
        Resolved::Labels(labels) => labels.is_empty(),
    }
}

/// Ordering of the field relative to the value.  Only `task.dueDate` is
/// ordered; every other field is a type mismatch.
fn compare(field: &Resolved<'_>, value: Option<&ConditionValue>) -> Option<std::cmp::Ordering> {
    match field {
        Resolved::Date(Some(due)) => parse_instant(value).map(|v| due.cmp(&v)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Value coercion
// ---------------------------------------------------------------------------

/// String form of a scalar value; `None` (absent value) is `""`, lists have
/// no string form.
fn normalize(value: Option<&ConditionValue>) -> Option<String> {
    match value {
        None => Some(String::new()),
        Some(ConditionValue::Text(s)) => Some(s.clone()),
        Some(ConditionValue::Bool(b)) => Some(b.to_string()),
        Some(ConditionValue::Number(n)) => Some(number_to_string(*n)),
        Some(ConditionValue::List(_)) => None,
    }
}

fn number_to_string(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn value_set(value: Option<&ConditionValue>) -> Option<BTreeSet<&str>> {
    match value {
        None => Some(BTreeSet::new()),
        Some(ConditionValue::List(items)) => Some(items.iter().map(String::as_str).collect()),
        Some(ConditionValue::Text(s)) => Some(BTreeSet::from([s.as_str()])),
        Some(_) => None,
    }
}

fn parse_instant(value: Option<&ConditionValue>) -> Option<DateTime<Utc>> {
    match value? {
        ConditionValue::Text(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use board::{BoardList, Card};
    use chrono::TimeZone;

    use ConditionField as F;
    use ConditionOperator as Op;

    fn card() -> Card {
        let mut card = Card::new("c1", "b1", "todo", "URGENT: fix login");
        card.labels = vec![
            Label { id: "l1".into(), name: "Bug".into(), color: None },
            Label { id: "l2".into(), name: "Backend".into(), color: Some("blue".into()) },
        ];
        card.due_date = Some(Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap());
        card
    }

    fn ctx(card: Card) -> EventContext {
        EventContext::for_card(card).with_list(BoardList { id: "todo".into(), name: "To Do".into() })
    }

    fn check(cond: Condition, context: &EventContext) -> bool {
        evaluate_condition(&cond, context)
    }

    #[test]
    fn empty_condition_list_passes() {
        assert!(evaluate(&[], &EventContext::default()));
    }

    #[test]
    fn conditions_are_and_combined() {
        let context = ctx(card());
        let both = [
            Condition::new(F::TaskTitle, Op::Contains, "URGENT"),
            Condition::new(F::ListName, Op::Equals, "To Do"),
        ];
        let one_fails = [
            Condition::new(F::TaskTitle, Op::Contains, "URGENT"),
            Condition::new(F::ListName, Op::Equals, "Done"),
        ];
        assert!(evaluate(&both, &context));
        assert!(!evaluate(&one_fails, &context));
    }

    #[test]
    fn string_equality_is_case_sensitive() {
        let context = ctx(card());
        assert!(check(Condition::new(F::ListName, Op::Equals, "To Do"), &context));
        assert!(!check(Condition::new(F::ListName, Op::Equals, "to do"), &context));
        assert!(check(Condition::new(F::ListName, Op::NotEquals, "to do"), &context));
    }

    #[test]
    fn contains_is_substring_match() {
        let context = ctx(card());
        assert!(check(Condition::new(F::TaskTitle, Op::Contains, "login"), &context));
        assert!(check(Condition::new(F::TaskTitle, Op::NotContains, "logout"), &context));

        let routine = ctx(Card::new("c2", "b1", "todo", "routine cleanup"));
        assert!(!check(Condition::new(F::TaskTitle, Op::Contains, "URGENT"), &routine));
    }

    #[test]
    fn is_empty_covers_missing_and_empty_strings() {
        let mut c = card();
        let cond = Condition::unary(F::TaskDescription, Op::IsEmpty);
        let negated = Condition::unary(F::TaskDescription, Op::IsNotEmpty);

        c.description = None;
        assert!(check(cond.clone(), &ctx(c.clone())));
        assert!(!check(negated.clone(), &ctx(c.clone())));

        c.description = Some(String::new());
        assert!(check(cond.clone(), &ctx(c.clone())));
        assert!(!check(negated.clone(), &ctx(c.clone())));

        c.description = Some("steps to reproduce".into());
        assert!(!check(cond, &ctx(c.clone())));
        assert!(check(negated, &ctx(c)));
    }

    #[test]
    fn is_empty_ignores_value() {
        let mut cond = Condition::unary(F::TaskAssigneeId, Op::IsEmpty);
        cond.value = Some(ConditionValue::Text("ignored".into()));
        assert!(check(cond, &ctx(card())));
    }

    #[test]
    fn missing_task_behaves_like_empty_fields() {
        let context = EventContext::default();
        assert!(check(Condition::unary(F::TaskTitle, Op::IsEmpty), &context));
        assert!(check(Condition::unary(F::TaskLabels, Op::IsEmpty), &context));
        assert!(check(Condition::new(F::TaskAssigneeId, Op::Equals, ""), &context));
        assert!(!check(Condition::new(F::TaskTitle, Op::Contains, "x"), &context));
        assert!(check(Condition::unary(F::TaskArchived, Op::IsEmpty), &context));
        assert!(!check(Condition::unary(F::TaskArchived, Op::IsNotEmpty), &context));
        assert!(!check(Condition::new(F::TaskArchived, Op::Equals, false), &context));
    }

    #[test]
    fn labels_use_set_equality_by_name_or_id() {
        let context = ctx(card());
        let by_names = vec!["Backend".to_owned(), "Bug".to_owned()];
        let by_ids = vec!["l2".to_owned(), "l1".to_owned()];
        let subset = vec!["Bug".to_owned()];

        assert!(check(Condition::new(F::TaskLabels, Op::Equals, by_names), &context));
        assert!(check(Condition::new(F::TaskLabels, Op::Equals, by_ids), &context));
        assert!(!check(Condition::new(F::TaskLabels, Op::Equals, subset.clone()), &context));
        assert!(check(Condition::new(F::TaskLabels, Op::Contains, subset), &context));
        assert!(check(Condition::new(F::TaskLabels, Op::Contains, "l2"), &context));
        assert!(check(Condition::new(F::TaskLabels, Op::NotContains, "Frontend"), &context));
    }

    #[test]
    fn due_dates_compare_chronologically() {
        let context = ctx(card());
        let before = "2024-05-01T00:00:00Z";
        let after = "2024-06-01T00:00:00+02:00";
        let same_instant = "2024-05-10T14:00:00+02:00";

        assert!(check(Condition::new(F::TaskDueDate, Op::GreaterThan, before), &context));
        assert!(check(Condition::new(F::TaskDueDate, Op::LessThan, after), &context));
        assert!(check(Condition::new(F::TaskDueDate, Op::Equals, same_instant), &context));
    }

    #[test]
    fn comparison_mismatches_are_false() {
        let context = ctx(card());
        assert!(!check(Condition::new(F::TaskDueDate, Op::GreaterThan, "next tuesday"), &context));
        assert!(!check(Condition::new(F::TaskDueDate, Op::LessThan, 5.0), &context));
        assert!(!check(Condition::new(F::TaskTitle, Op::GreaterThan, 1.0), &context));
        assert!(!check(Condition::new(F::TaskLabels, Op::LessThan, 1.0), &context));
        assert!(!check(Condition::new(F::TaskArchived, Op::GreaterThan, true), &context));
    }

    #[test]
    fn numeric_looking_text_fields_do_not_order() {
        let mut c = card();
        c.title = "42".into();
        c.assignee_id = Some("7".into());
        let context = ctx(c);
        assert!(!check(Condition::new(F::TaskTitle, Op::GreaterThan, 10.0), &context));
        assert!(!check(Condition::new(F::TaskTitle, Op::LessThan, "100"), &context));
        assert!(!check(Condition::new(F::TaskAssigneeId, Op::LessThan, 8.0), &context));
        assert!(!check(Condition::new(F::ListName, Op::GreaterThan, "A"), &context));
    }

    #[test]
    fn numbers_and_bools_are_stringified_for_equality() {
        let mut c = card();
        c.title = "42".into();
        let context = ctx(c);
        assert!(check(Condition::new(F::TaskTitle, Op::Equals, 42.0), &context));
        assert!(!check(Condition::new(F::TaskTitle, Op::GreaterThan, 41.5), &context));
        assert!(check(Condition::new(F::TaskArchived, Op::Equals, false), &context));
        assert!(check(Condition::new(F::TaskArchived, Op::Equals, "false"), &context));
    }
}
