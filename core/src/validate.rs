//! Client-side input checks run before any request is sent.
//!
//! Every check runs; violations are collected and returned together in one
//! `ApiError::Validation` rather than stopping at the first bad field.

use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult, Violation};
use crate::types::{NodeUpdate, Offset};

/// Upper bound on node text (and diagram titles, which become root text).
pub const MAX_TEXT_CHARS: usize = 3000;

fn finish(violations: Vec<Violation>) -> ApiResult<()> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(violations))
    }
}

fn check_text(field: &str, text: &str, violations: &mut Vec<Violation>) {
    let chars = text.chars().count();
    if chars > MAX_TEXT_CHARS {
        violations.push(Violation::new(
            field,
            format!("must be at most {MAX_TEXT_CHARS} characters, got {chars}"),
        ));
    }
}

fn check_offset(offset: &Offset, violations: &mut Vec<Violation>) {
    if !offset.x.is_finite() {
        violations.push(Violation::new("offset.x", "must be a finite number"));
    }
    if !offset.y.is_finite() {
        violations.push(Violation::new("offset.y", "must be a finite number"));
    }
}

/// The service seeds a new diagram's root node with its title, so a title
/// is held to the same length limit as node text.
pub fn check_title(title: &str) -> ApiResult<()> {
    let mut violations = Vec::new();
    check_text("title", title, &mut violations);
    finish(violations)
}

pub fn check_update(update: &NodeUpdate) -> ApiResult<()> {
    let mut violations = Vec::new();
    check_update_into(update, &mut violations);
    finish(violations)
}

fn check_update_into(update: &NodeUpdate, violations: &mut Vec<Violation>) {
    if let Some(parent) = &update.parent {
        if parent.trim().is_empty() {
            violations.push(Violation::new("parent", "must be a non-empty node id"));
        }
    }
    if let Some(offset) = &update.offset {
        check_offset(offset, violations);
    }
    if let Some(text) = &update.text {
        check_text("text", text, violations);
    }
}

fn number_field(offset: &Map<String, Value>, axis: &str, violations: &mut Vec<Violation>) -> Option<f64> {
    let field = format!("offset.{axis}");
    match offset.get(axis) {
        Some(Value::Number(n)) => n.as_f64().or_else(|| {
            violations.push(Violation::new(&field, "must be a finite number"));
            None
        }),
        Some(_) => {
            violations.push(Violation::new(&field, "must be a number"));
            None
        }
        None => {
            violations.push(Violation::new(&field, "is required"));
            None
        }
    }
}

/// Build a `NodeUpdate` from an untyped JSON object, checking both shape
/// and the same limits as `check_update`.
///
/// Recognized keys are `parent`, `offset` and `text`; anything else is a
/// violation.
pub fn parse_update(properties: &Value) -> ApiResult<NodeUpdate> {
    let Some(object) = properties.as_object() else {
        return Err(ApiError::Validation(vec![Violation::new(
            "properties",
            "must be a JSON object",
        )]));
    };

    let mut violations = Vec::new();
    let mut update = NodeUpdate::new();

    for (key, value) in object {
        match key.as_str() {
            "parent" => match value {
                Value::String(parent) => update.parent = Some(parent.clone()),
                _ => violations.push(Violation::new("parent", "must be a string")),
            },
            "offset" => match value {
                Value::Object(offset) => {
                    let x = number_field(offset, "x", &mut violations);
                    let y = number_field(offset, "y", &mut violations);
                    if let (Some(x), Some(y)) = (x, y) {
                        update.offset = Some(Offset::new(x, y));
                    }
                }
                _ => violations.push(Violation::new("offset", "must be an object with x and y")),
            },
            "text" => match value {
                Value::String(text) => update.text = Some(text.clone()),
                _ => violations.push(Violation::new("text", "must be a string")),
            },
            other => violations.push(Violation::new(other, "is not an updatable property")),
        }
    }

    check_update_into(&update, &mut violations);
    finish(violations)?;
    Ok(update)
}
