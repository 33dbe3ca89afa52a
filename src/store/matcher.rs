//! Query, update and projection evaluation for the in-memory store.
//!
//! Covers the subset of MongoDB operators the tools expose in practice.

use std::cmp::Ordering;

use mongodb::bson::{Bson, Document};

use crate::error::{McpError, Result};

fn bad_query(message: impl Into<String>) -> McpError {
    McpError::operation("BAD_VALUE", message)
}

/// Resolve a dotted path. Numeric segments index into arrays.
pub(super) fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(sub) => sub.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set a dotted path, creating intermediate documents.
pub(super) fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<()> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Bson::Document(Document::new()));
            match entry {
                Bson::Document(sub) => set_path(sub, rest, value),
                other => Err(McpError::operation(
                    "PATH_NOT_VIABLE",
                    format!(
                        "cannot create field '{}' in element {{{}: {}}}",
                        rest, head, other
                    ),
                )),
            }
        }
    }
}

/// Remove a dotted path. Missing paths are ignored.
pub(super) fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(sub)) = doc.get_mut(head) {
                remove_path(sub, rest);
            }
        }
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        _ => None,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

/// Integers compare exactly; doubles are only involved when one side is one.
fn compare_numbers(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (as_i64(a), as_i64(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => as_f64(a)?.partial_cmp(&as_f64(b)?),
    }
}

fn bson_eq(a: &Bson, b: &Bson) -> bool {
    if as_f64(a).is_some() && as_f64(b).is_some() {
        return compare_numbers(a, b) == Some(Ordering::Equal);
    }
    a == b
}

fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if as_f64(a).is_some() && as_f64(b).is_some() {
        return compare_numbers(a, b);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Equality with MongoDB's array semantics: a scalar query value matches an
/// array field containing it, and a missing field matches `null`.
fn field_eq(field: Option<&Bson>, value: &Bson) -> bool {
    match field {
        None => matches!(value, Bson::Null),
        Some(Bson::Array(items)) if !matches!(value, Bson::Array(_)) => {
            items.iter().any(|item| bson_eq(item, value))
        }
        Some(field) => bson_eq(field, value),
    }
}

fn field_cmp(field: Option<&Bson>, value: &Bson, accept: fn(Ordering) -> bool) -> bool {
    match field {
        None => false,
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| compare(item, value).is_some_and(accept)),
        Some(field) => compare(field, value).is_some_and(accept),
    }
}

fn is_operator_doc(value: &Bson) -> bool {
    match value {
        Bson::Document(d) => d.keys().next().is_some_and(|k| k.starts_with('$')),
        _ => false,
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        other => as_f64(other).map_or(true, |f| f != 0.0),
    }
}

fn sub_filters<'a>(op: &str, value: &'a Bson) -> Result<Vec<&'a Document>> {
    let items = match value {
        Bson::Array(items) if !items.is_empty() => items,
        _ => return Err(bad_query(format!("{} must be a nonempty array", op))),
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Ok(d),
            _ => Err(bad_query(format!("{} entries must be objects", op))),
        })
        .collect()
}

/// Whether `doc` satisfies `filter`.
pub(super) fn matches(doc: &Document, filter: &Document) -> Result<bool> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for sub in sub_filters(key, condition)? {
                    all &= matches(doc, sub)?;
                }
                all
            }
            "$or" => {
                let mut any = false;
                for sub in sub_filters(key, condition)? {
                    any |= matches(doc, sub)?;
                }
                any
            }
            "$nor" => {
                let mut any = false;
                for sub in sub_filters(key, condition)? {
                    any |= matches(doc, sub)?;
                }
                !any
            }
            op if op.starts_with('$') => {
                return Err(bad_query(format!("unknown top level operator: {}", op)))
            }
            path => match_condition(get_path(doc, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn match_condition(field: Option<&Bson>, condition: &Bson) -> Result<bool> {
    let ops = match condition {
        Bson::Document(ops) if is_operator_doc(condition) => ops,
        _ => return Ok(field_eq(field, condition)),
    };

    for (op, value) in ops {
        let ok = match op.as_str() {
            "$eq" => field_eq(field, value),
            "$ne" => !field_eq(field, value),
            "$gt" => field_cmp(field, value, Ordering::is_gt),
            "$gte" => field_cmp(field, value, Ordering::is_ge),
            "$lt" => field_cmp(field, value, Ordering::is_lt),
            "$lte" => field_cmp(field, value, Ordering::is_le),
            "$in" | "$nin" => {
                let candidates = match value {
                    Bson::Array(items) => items,
                    _ => return Err(bad_query(format!("{} needs an array", op))),
                };
                let found = candidates.iter().any(|c| field_eq(field, c));
                if op == "$in" {
                    found
                } else {
                    !found
                }
            }
            "$exists" => truthy(value) == field.is_some(),
            "$not" => !match_condition(field, value)?,
            other => return Err(bad_query(format!("unknown operator: {}", other))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Document an upsert starts from: the filter's plain equality fields.
pub(super) fn upsert_seed(filter: &Document) -> Result<Document> {
    let mut seed = Document::new();
    for (key, value) in filter {
        if key.starts_with('$') || is_operator_doc(value) {
            continue;
        }
        set_path(&mut seed, key, value.clone())?;
    }
    Ok(seed)
}

/// Reject replacement-style updates.
pub(super) fn validate_update(update: &Document) -> Result<()> {
    if update.is_empty() || update.keys().any(|k| !k.starts_with('$')) {
        return Err(McpError::operation(
            "FAILED_TO_PARSE",
            "update document requires atomic operators",
        ));
    }
    Ok(())
}

/// `$inc` arithmetic. Int32 overflow widens to Int64; Int64 overflow fails.
fn add_numbers(path: &str, current: &Bson, delta: &Bson) -> Result<Bson> {
    match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => Ok(a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or_else(|| Bson::Int64(i64::from(*a) + i64::from(*b)))),
        _ => match (as_i64(current), as_i64(delta)) {
            (Some(a), Some(b)) => a.checked_add(b).map(Bson::Int64).ok_or_else(|| {
                McpError::operation(
                    "BAD_VALUE",
                    format!("$inc on field '{}' would overflow: {} + {}", path, a, b),
                )
            }),
            _ => match (as_f64(current), as_f64(delta)) {
                (Some(a), Some(b)) => Ok(Bson::Double(a + b)),
                _ => Err(McpError::operation(
                    "TYPE_MISMATCH",
                    format!("cannot apply $inc to non-numeric field '{}'", path),
                )),
            },
        },
    }
}

/// Apply update operators in place.
///
/// `inserting` enables `$setOnInsert`. Changing `_id` is rejected.
pub(super) fn apply_update(doc: &mut Document, update: &Document, inserting: bool) -> Result<()> {
    validate_update(update)?;
    let original_id = doc.get("_id").cloned();

    for (op, fields) in update {
        let fields = match fields {
            Bson::Document(fields) => fields,
            _ => {
                return Err(McpError::operation(
                    "FAILED_TO_PARSE",
                    format!("modifier {} expects an object", op),
                ))
            }
        };

        for (path, value) in fields {
            match op.as_str() {
                "$set" => set_path(doc, path, value.clone())?,
                "$setOnInsert" => {
                    if inserting {
                        set_path(doc, path, value.clone())?;
                    }
                }
                "$unset" => remove_path(doc, path),
                "$inc" => {
                    if as_f64(value).is_none() {
                        return Err(McpError::operation(
                            "TYPE_MISMATCH",
                            format!("cannot increment with non-numeric argument: {}", value),
                        ));
                    }
                    let next = match get_path(doc, path) {
                        None => value.clone(),
                        Some(current) => add_numbers(path, current, value)?,
                    };
                    set_path(doc, path, next)?;
                }
                "$push" => {
                    let next = match get_path(doc, path) {
                        None => vec![value.clone()],
                        Some(Bson::Array(items)) => {
                            let mut items = items.clone();
                            items.push(value.clone());
                            items
                        }
                        Some(_) => {
                            return Err(McpError::operation(
                                "BAD_VALUE",
                                format!("the field '{}' must be an array", path),
                            ))
                        }
                    };
                    set_path(doc, path, Bson::Array(next))?;
                }
                other => {
                    return Err(McpError::operation(
                        "FAILED_TO_PARSE",
                        format!("unknown modifier: {}", other),
                    ))
                }
            }
        }
    }

    if original_id.is_some() && doc.get("_id") != original_id.as_ref() {
        return Err(McpError::operation(
            "IMMUTABLE_FIELD",
            "performing an update on the path '_id' would modify the immutable field '_id'",
        ));
    }
    Ok(())
}

/// Apply an inclusion or exclusion projection.
pub(super) fn project(doc: &Document, projection: &Document) -> Result<Document> {
    if projection.is_empty() {
        return Ok(doc.clone());
    }

    let keep_id = projection.get("_id").map_or(true, truthy);
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for (path, flag) in projection {
        if path == "_id" {
            continue;
        }
        if truthy(flag) {
            include.push(path.as_str());
        } else {
            exclude.push(path.as_str());
        }
    }

    if !include.is_empty() && !exclude.is_empty() {
        return Err(McpError::operation(
            "BAD_PROJECTION",
            format!(
                "cannot do exclusion on field {} in inclusion projection",
                exclude[0]
            ),
        ));
    }

    if include.is_empty() {
        let mut out = doc.clone();
        for path in exclude {
            remove_path(&mut out, path);
        }
        if !keep_id {
            out.remove("_id");
        }
        return Ok(out);
    }

    let mut out = Document::new();
    if keep_id {
        if let Some(id) = doc.get("_id") {
            out.insert("_id", id.clone());
        }
    }
    for path in include {
        if let Some(value) = get_path(doc, path) {
            set_path(&mut out, path, value.clone())?;
        }
    }
    Ok(out)
}
