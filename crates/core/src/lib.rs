// Path addressing and base64 expansion for JSON-like data

pub mod error;
pub mod eval;
pub mod expand;
pub mod path;
pub mod value;

pub use error::{PathError, PathResult};
pub use expand::{Expander, MAX_EXPAND_DEPTH};
pub use path::{escape_key, AsPath, Path, PathComponent};
pub use value::{Map, Value};

/// Parse a path expression into its components
pub fn parse_path(text: &str) -> PathResult<Path> {
    path::parse(text)
}

/// Read the value at `path` (a parsed [`Path`] or raw text)
pub fn get_path<P: AsPath + ?Sized>(data: &Value, path: &P) -> PathResult<Value> {
    let path = path.as_path()?;
    eval::get(data, &path)
}

/// Whether `path` resolves in `data`; unparseable text yields `false`
pub fn has_path<P: AsPath + ?Sized>(data: &Value, path: &P) -> bool {
    match path.as_path() {
        Ok(path) => eval::has(data, &path),
        Err(_) => false,
    }
}

/// Return a new tree with `value` stored at `path`; `data` is not modified
pub fn set_path<P: AsPath + ?Sized>(data: &Value, path: &P, value: Value) -> PathResult<Value> {
    let path = path.as_path()?;
    eval::set(data, &path, value)
}

/// Expand base64-encoded JSON (and layered base64) anywhere in `value`
pub fn base64_expand(value: &Value) -> Value {
    Expander::default().expand(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        Value::from(json!({"a": {"b": [10, 20, 30]}}))
    }

    #[test]
    fn test_get_path_accepts_text_and_parsed_paths() {
        let data = sample();
        let owned = String::from("a.b[-1]");
        let parsed = parse_path("a.b[-1]").unwrap();

        assert_eq!(get_path(&data, "a.b[-1]").unwrap(), Value::from(30));
        assert_eq!(get_path(&data, &owned).unwrap(), Value::from(30));
        assert_eq!(get_path(&data, &parsed).unwrap(), Value::from(30));
    }

    #[test]
    fn test_set_path_accepts_text_and_parsed_paths() {
        let data = sample();
        let parsed = parse_path("a.b[0]").unwrap();

        let from_text = set_path(&data, "a.b[0]", Value::from(1)).unwrap();
        let from_parsed = set_path(&data, &parsed, Value::from(1)).unwrap();

        assert_eq!(from_text, from_parsed);
        assert_eq!(get_path(&from_text, "a.b[0]").unwrap(), Value::from(1));
        assert_eq!(get_path(&data, "a.b[0]").unwrap(), Value::from(10));
    }

    #[test]
    fn test_facade_reports_parse_errors() {
        let data = sample();
        assert!(matches!(get_path(&data, "a["), Err(PathError::Parse { .. })));
        assert!(matches!(
            set_path(&data, "a]", Value::Null),
            Err(PathError::Parse { .. })
        ));
        assert!(!has_path(&data, "a["));
    }
}
