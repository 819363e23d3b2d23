// Path evaluation: get/has/set against a Value tree

use crate::error::{PathError, PathResult};
use crate::path::{Path, PathComponent};
use crate::value::{Map, Value};

/// Resolve an end-relative index against an array length
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

fn mismatch(expected: &'static str, found: &Value, path: &Path, depth: usize) -> PathError {
    PathError::TypeMismatch {
        expected,
        found: found.kind(),
        at: path.prefix(depth),
    }
}

fn out_of_range(index: i64, len: usize, path: &Path, depth: usize) -> PathError {
    PathError::IndexOutOfRange {
        index,
        len,
        at: path.prefix(depth),
    }
}

fn key_not_found(key: &str, path: &Path, depth: usize) -> PathError {
    PathError::KeyNotFound {
        key: key.to_string(),
        at: path.prefix(depth),
    }
}

/// Read the value at `path`.
///
/// A `SelectAll` maps the remainder of the path over every array element
/// and collects the results into a new array.
pub fn get(data: &Value, path: &Path) -> PathResult<Value> {
    walk(data, path, 0)
}

fn walk(data: &Value, path: &Path, start: usize) -> PathResult<Value> {
    let mut current = data;

    for (depth, component) in path.iter().enumerate().skip(start) {
        current = match component {
            PathComponent::Key(key) => match current {
                Value::Object(map) => map
                    .get(key)
                    .ok_or_else(|| key_not_found(key, path, depth))?,
                other => return Err(mismatch("object", other, path, depth)),
            },
            PathComponent::Index(index) => match current {
                Value::Array(items) => {
                    let pos = resolve_index(*index, items.len())
                        .ok_or_else(|| out_of_range(*index, items.len(), path, depth))?;
                    &items[pos]
                }
                other => return Err(mismatch("array", other, path, depth)),
            },
            PathComponent::SelectAll => match current {
                Value::Array(items) => {
                    let results = items
                        .iter()
                        .map(|item| walk(item, path, depth + 1))
                        .collect::<PathResult<Vec<_>>>()?;
                    return Ok(Value::Array(results));
                }
                other => return Err(mismatch("array", other, path, depth)),
            },
        };
    }

    Ok(current.clone())
}

/// Whether `get` would succeed.
pub fn has(data: &Value, path: &Path) -> bool {
    get(data, path).is_ok()
}

/// Return a copy of `data` with `value` stored at `path`.
///
/// Missing object levels are created when the next component is a key.
/// Arrays are never grown.
pub fn set(data: &Value, path: &Path, value: Value) -> PathResult<Value> {
    if path.contains_wildcard() {
        return Err(PathError::WildcardNotSettable);
    }

    let mut root = data.clone();
    assign(&mut root, path, value)?;
    Ok(root)
}

fn assign(root: &mut Value, path: &Path, value: Value) -> PathResult<()> {
    let Some((last, spine)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for (depth, component) in spine.iter().enumerate() {
        let following = &path[depth + 1];
        current = descend(current, component, following, path, depth)?;
    }

    place(current, last, value, path, spine.len())
}

fn descend<'v>(
    node: &'v mut Value,
    component: &PathComponent,
    following: &PathComponent,
    path: &Path,
    depth: usize,
) -> PathResult<&'v mut Value> {
    match component {
        PathComponent::Key(key) => {
            let found = node.kind();
            let Value::Object(map) = node else {
                return Err(PathError::TypeMismatch {
                    expected: "object",
                    found,
                    at: path.prefix(depth),
                });
            };
            if !map.contains_key(key) {
                if !matches!(following, PathComponent::Key(_)) {
                    return Err(key_not_found(key, path, depth));
                }
                tracing::trace!(key = %key, at = %path.prefix(depth), "creating intermediate object");
                map.insert(key.clone(), Value::Object(Map::new()));
            }
            map.get_mut(key)
                .ok_or_else(|| key_not_found(key, path, depth))
        }
        PathComponent::Index(index) => {
            let found = node.kind();
            let Value::Array(items) = node else {
                return Err(PathError::TypeMismatch {
                    expected: "array",
                    found,
                    at: path.prefix(depth),
                });
            };
            let len = items.len();
            let pos = resolve_index(*index, len).ok_or_else(|| out_of_range(*index, len, path, depth))?;
            Ok(&mut items[pos])
        }
        PathComponent::SelectAll => Err(PathError::WildcardNotSettable),
    }
}

fn place(
    node: &mut Value,
    component: &PathComponent,
    value: Value,
    path: &Path,
    depth: usize,
) -> PathResult<()> {
    match (component, node) {
        (PathComponent::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (PathComponent::Index(index), Value::Array(items)) => {
            let len = items.len();
            let pos = resolve_index(*index, len).ok_or_else(|| out_of_range(*index, len, path, depth))?;
            items[pos] = value;
            Ok(())
        }
        (PathComponent::Key(_), other) => Err(mismatch("object", other, path, depth)),
        (PathComponent::Index(_), other) => Err(mismatch("array", other, path, depth)),
        (PathComponent::SelectAll, _) => Err(PathError::WildcardNotSettable),
    }
}
