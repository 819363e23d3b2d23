pub mod expand;
pub mod path;
mod registry;

pub use expand::Base64ExpandTool;
pub use path::{PathGetTool, PathHasTool, PathParseTool, PathSetTool};
pub use registry::{
    json_schema_any, json_schema_number, json_schema_object, json_schema_string, Tool,
    ToolRegistry,
};

use nestpath_core::Expander;
use std::sync::Arc;

/// Registry holding every nestpath tool
pub fn default_registry(expander: Expander) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // Path tools
    registry.register(Arc::new(PathParseTool));
    registry.register(Arc::new(PathGetTool));
    registry.register(Arc::new(PathHasTool));
    registry.register(Arc::new(PathSetTool));

    // Encoding tools
    registry.register(Arc::new(Base64ExpandTool::new(expander)));

    registry
}
