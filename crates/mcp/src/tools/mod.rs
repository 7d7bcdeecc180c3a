pub mod optimize;
mod registry;

pub use optimize::{
    describe_failure, filter_goals, render_success, validate_arguments, OptimizationBackend,
    OptimizePromptTool, ValidationError, OPTIMIZE_PROMPT,
};
pub use registry::{
    json_schema_array, json_schema_enum, json_schema_object, json_schema_string, Tool,
    ToolRegistry,
};
