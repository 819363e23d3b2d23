// Encoding tools for normalizing base64-wrapped payloads

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_any, json_schema_number, json_schema_object, Tool};
use anyhow::{Context, Result};
use nestpath_core::{Expander, Value};
use serde::Deserialize;

/// Tool to recursively decode base64-encoded JSON inside a value
pub struct Base64ExpandTool {
    expander: Expander,
}

impl Base64ExpandTool {
    pub fn new(expander: Expander) -> Self {
        Self { expander }
    }
}

impl Default for Base64ExpandTool {
    fn default() -> Self {
        Self::new(Expander::default())
    }
}

#[derive(Debug, Deserialize)]
struct Base64ExpandArgs {
    #[serde(default)]
    value: Value,
    #[serde(default)]
    max_depth: Option<usize>,
}

#[async_trait::async_trait]
impl Tool for Base64ExpandTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "base64_expand".to_string(),
            description: "Recursively decode base64 strings that contain JSON or further base64. \
Strings that are not valid base64 text are returned unchanged"
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "value": json_schema_any("Any JSON value; strings anywhere inside are expanded"),
                    "max_depth": json_schema_number(&format!(
                        "Maximum decode layers per string (default: {})",
                        self.expander.max_depth()
                    ))
                }),
                vec!["value"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: Base64ExpandArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for base64_expand")?;

        let expander = args
            .max_depth
            .map(Expander::with_max_depth)
            .unwrap_or(self.expander);

        let expanded = expander.expand(&args.value);
        let json = serde_json::to_string_pretty(&expanded)?;
        Ok(CallToolResult::text(json))
    }
}
