// Structural patching of the shared state document

use agui_types::{PatchOp, PatchOpKind};
use serde_json::Value;

use crate::error::{PatchError, Result};

/// Apply `ops` in order to a copy of `document`.
///
/// The input is never mutated. The first failing operation rejects the
/// whole delta, so callers either get every edit or none.
pub fn apply(document: &Value, ops: &[PatchOp]) -> Result<Value> {
    let mut patched = document.clone();
    for op in ops {
        apply_op(&mut patched, op)?;
    }
    Ok(patched)
}

/// Decode the `delta` array of a `STATE_DELTA` event.
pub fn parse_ops(delta: &Value) -> Result<Vec<PatchOp>> {
    let entries = delta.as_array().ok_or_else(|| PatchError::MalformedOp {
        position: 0,
        reason: "delta is not an array".to_string(),
    })?;

    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            serde_json::from_value(entry.clone()).map_err(|e| PatchError::MalformedOp {
                position,
                reason: e.to_string(),
            })
        })
        .collect()
}

fn apply_op(document: &mut Value, op: &PatchOp) -> Result<()> {
    let segments = op.segments();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| PatchError::RootPath(op.path.clone()))?;

    let parent = navigate(document, parents, &op.path)?;

    match op.op {
        PatchOpKind::Add | PatchOpKind::Replace => set(parent, last, op.value.clone(), &op.path),
        PatchOpKind::Remove => remove(parent, last, &op.path),
    }
}

/// Walk to the container holding the last segment.
fn navigate<'a>(document: &'a mut Value, segments: &[String], path: &str) -> Result<&'a mut Value> {
    let mut current = document;
    for segment in segments {
        current = match current {
            Value::Object(map) => map
                .get_mut(segment)
                .ok_or_else(|| PatchError::PathNotFound(path.to_string()))?,
            Value::Array(items) => {
                let index = parse_index(segment, path)?;
                let len = items.len();
                items.get_mut(index).ok_or(PatchError::IndexOutOfBounds {
                    path: path.to_string(),
                    index,
                    len,
                })?
            }
            _ => return Err(PatchError::NotAContainer(path.to_string())),
        };
    }
    Ok(current)
}

fn set(parent: &mut Value, key: &str, value: Value, path: &str) -> Result<()> {
    match parent {
        Value::Object(map) => {
            map.insert(key.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            if key == "-" {
                items.push(value);
                return Ok(());
            }
            let index = parse_index(key, path)?;
            match index.cmp(&items.len()) {
                std::cmp::Ordering::Less => items[index] = value,
                std::cmp::Ordering::Equal => items.push(value),
                std::cmp::Ordering::Greater => {
                    return Err(PatchError::IndexOutOfBounds {
                        path: path.to_string(),
                        index,
                        len: items.len(),
                    })
                }
            }
            Ok(())
        }
        _ => Err(PatchError::NotAContainer(path.to_string())),
    }
}

fn remove(parent: &mut Value, key: &str, path: &str) -> Result<()> {
    match parent {
        Value::Object(map) => {
            map.remove(key);
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(key, path)?;
            if index < items.len() {
                items.remove(index);
            }
            Ok(())
        }
        _ => Err(PatchError::NotAContainer(path.to_string())),
    }
}

fn parse_index(segment: &str, path: &str) -> Result<usize> {
    // Reject "+1" and similar forms usize::from_str would accept
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PatchError::InvalidIndex {
            path: path.to_string(),
            index: segment.to_string(),
        });
    }
    segment.parse().map_err(|_| PatchError::InvalidIndex {
        path: path.to_string(),
        index: segment.to_string(),
    })
}
