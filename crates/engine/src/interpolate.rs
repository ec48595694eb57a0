//! `{{path}}` placeholder substitution for action text.
//!
//! Only a closed set of context paths resolves:
//!
//! | placeholder          | source                                   |
//! |----------------------|------------------------------------------|
//! | `task.title`         | card title                               |
//! | `task.description`   | card description                         |
//! | `task.dueDate`       | card due date, RFC 3339                  |
//! | `user.name`          | acting user                              |
//! | `list.name`          | current list                             |
//! | `label.name`         | label of a `label_*` event               |
//! | `payload.<a.b.c>`    | field of an inbound webhook body         |
//!
//! Anything else, or a path whose value is absent, becomes the empty string.
//! Substituted text is never scanned again.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::models::EventContext;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][\w.]*)\s*\}\}")
        .unwrap_or_else(|e| panic!("Invalid placeholder regex: {e}"))
});

/// Replace every placeholder in `template`.
pub fn interpolate(template: &str, context: &EventContext) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            lookup(&caps[1], context).unwrap_or_default()
        })
        .into_owned()
}

/// Interpolate every string leaf of a JSON template.  Keys and non-string
/// leaves are copied as is; substituted text stays a string value.
pub fn interpolate_json(template: &Value, context: &EventContext) -> Value {
    match template {
        Value::String(s) => Value::String(interpolate(s, context)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| interpolate_json(item, context))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_json(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn lookup(path: &str, context: &EventContext) -> Option<String> {
    if let Some(rest) = path.strip_prefix("payload.") {
        return payload_field(context.payload.as_ref()?, rest);
    }
    match path {
        "task.title" => context.task.as_ref().map(|t| t.title.clone()),
        "task.description" => context.task.as_ref()?.description.clone(),
        "task.dueDate" => context.task.as_ref()?.due_date.map(|d| d.to_rfc3339()),
        "user.name" => context.user.as_ref().map(|u| u.name.clone()),
        "list.name" => context.list.as_ref().map(|l| l.name.clone()),
        "label.name" => context.label.as_ref().map(|l| l.name.clone()),
        _ => None,
    }
}

fn payload_field(payload: &Value, path: &str) -> Option<String> {
    let value = path
        .split('.')
        .try_fold(payload, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })?;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board::{BoardList, Card, Member};
    use serde_json::json;

    fn context() -> EventContext {
        let mut card = Card::new("c1", "b1", "todo", "Fix login");
        card.description = Some("Users cannot sign in".into());
        EventContext::for_card(card)
            .with_user(Member { user_id: "u1".into(), name: "Ada".into() })
            .with_list(BoardList { id: "todo".into(), name: "To Do".into() })
    }

    #[test]
    fn known_paths_are_substituted() {
        let out = interpolate(
            "{{user.name}} moved '{{ task.title }}' to {{list.name}}: {{task.description}}",
            &context(),
        );
        assert_eq!(out, "Ada moved 'Fix login' to To Do: Users cannot sign in");
    }

    #[test]
    fn unknown_or_absent_paths_become_empty() {
        let out = interpolate("[{{task.secret}}][{{label.name}}][{{task.dueDate}}]", &context());
        assert_eq!(out, "[][][]");
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let mut ctx = context();
        ctx.task.as_mut().unwrap().title = "{{user.name}}".into();
        assert_eq!(interpolate("{{task.title}}", &ctx), "{{user.name}}");
    }

    #[test]
    fn payload_paths_walk_objects_and_arrays() {
        let mut ctx = context();
        ctx.payload = Some(json!({
            "build": { "status": "red", "number": 17, "tags": ["ci", "main"] }
        }));
        assert_eq!(
            interpolate("#{{payload.build.number}} is {{payload.build.status}} on {{payload.build.tags.1}}", &ctx),
            "#17 is red on main"
        );
        assert_eq!(interpolate("{{payload.build.missing}}", &ctx), "");
    }

    #[test]
    fn json_templates_interpolate_string_leaves_only() {
        let mut ctx = context();
        ctx.task.as_mut().unwrap().title = r#"","admin":true,"x":""#.into();

        let out = interpolate_json(
            &json!({ "title": "{{task.title}}", "count": 3, "nested": ["{{user.name}}", null] }),
            &ctx,
        );

        assert_eq!(out["title"], json!(r#"","admin":true,"x":""#));
        assert_eq!(out["count"], json!(3));
        assert_eq!(out["nested"], json!(["Ada", null]));
        assert!(out.get("admin").is_none());
    }
}
