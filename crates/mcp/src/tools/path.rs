// Path tools for reading and writing nested JSON by path expression

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_any, json_schema_object, json_schema_string, Tool};
use anyhow::{Context, Result};
use nestpath_core::{get_path, has_path, parse_path, set_path, Value};
use serde::Deserialize;

const PATH_SYNTAX: &str = "Path expression, e.g. a.b[0], items[-1].name, [\"dotted.key\"]. \
Use \\ to escape '.', '[' and ']'; [] selects every array element";

fn render(value: &impl serde::Serialize) -> Result<CallToolResult> {
    let json = serde_json::to_string_pretty(value)?;
    Ok(CallToolResult::text(json))
}

/// Tool to parse a path expression into components
pub struct PathParseTool;

#[derive(Debug, Deserialize)]
struct PathParseArgs {
    path: String,
}

#[async_trait::async_trait]
impl Tool for PathParseTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "path_parse".to_string(),
            description: "Parse a path expression and return its components".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "path": json_schema_string(PATH_SYNTAX)
                }),
                vec!["path"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: PathParseArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for path_parse")?;

        match parse_path(&args.path) {
            Ok(path) => render(&path),
            Err(e) => Ok(CallToolResult::error(e.to_string())),
        }
    }
}

/// Tool to read the value at a path
pub struct PathGetTool;

#[derive(Debug, Deserialize)]
struct PathGetArgs {
    #[serde(default)]
    data: Value,
    path: String,
}

#[async_trait::async_trait]
impl Tool for PathGetTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "path_get".to_string(),
            description: "Get the value at a path inside a JSON document".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "data": json_schema_any("The JSON document to read from"),
                    "path": json_schema_string(PATH_SYNTAX)
                }),
                vec!["data", "path"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: PathGetArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for path_get")?;

        match get_path(&args.data, &args.path) {
            Ok(value) => render(&value),
            Err(e) => Ok(CallToolResult::error(e.to_string())),
        }
    }
}

/// Tool to check whether a path resolves
pub struct PathHasTool;

#[async_trait::async_trait]
impl Tool for PathHasTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "path_has".to_string(),
            description: "Check whether a path exists inside a JSON document".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "data": json_schema_any("The JSON document to inspect"),
                    "path": json_schema_string(PATH_SYNTAX)
                }),
                vec!["data", "path"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: PathGetArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for path_has")?;

        render(&has_path(&args.data, &args.path))
    }
}

/// Tool to write a value at a path, returning the updated document
pub struct PathSetTool;

#[derive(Debug, Deserialize)]
struct PathSetArgs {
    #[serde(default)]
    data: Value,
    path: String,
    #[serde(default)]
    value: Value,
}

#[async_trait::async_trait]
impl Tool for PathSetTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "path_set".to_string(),
            description: "Set the value at a path and return the updated JSON document. \
Missing objects along the path are created; arrays are never extended"
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "data": json_schema_any("The JSON document to update"),
                    "path": json_schema_string(PATH_SYNTAX),
                    "value": json_schema_any("The value to store")
                }),
                vec!["data", "path", "value"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: PathSetArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for path_set")?;

        match set_path(&args.data, &args.path, args.value) {
            Ok(updated) => render(&updated),
            Err(e) => Ok(CallToolResult::error(e.to_string())),
        }
    }
}
