//! Adapter from MCP tool descriptors to the function specs sent to the model.
//!
//! The model never sees `owner_id`: the gateway stamps it on every call, so
//! the parameter is stripped from the advertised schema.

use serde_json::{json, Value};

use crate::constants::OWNER_ID_FIELD;
use crate::mcp::protocol::ToolDescriptor;
use crate::provider::types::{FunctionSpec, ModelToolSpec};

/// Builds the model-facing spec for `descriptor`. The descriptor is left untouched.
pub fn to_model_tool(descriptor: &ToolDescriptor) -> ModelToolSpec {
    let mut parameters = descriptor
        .input_schema
        .clone()
        .unwrap_or_else(|| json!({ "type": "object", "properties": {} }));

    if let Some(schema) = parameters.as_object_mut() {
        if let Some(Value::Object(props)) = schema.get_mut("properties") {
            props.remove(OWNER_ID_FIELD);
        }

        let drop_required = match schema.get_mut("required") {
            Some(Value::Array(required)) => {
                required.retain(|v| v.as_str() != Some(OWNER_ID_FIELD));
                required.is_empty()
            }
            _ => false,
        };
        if drop_required {
            schema.remove("required");
        }
    }

    ModelToolSpec::function(FunctionSpec {
        name: descriptor.name.clone(),
        description: descriptor.description.clone(),
        parameters,
    })
}

/// Adapts a whole `tools/list` result.
pub fn to_model_tools(descriptors: &[ToolDescriptor]) -> Vec<ModelToolSpec> {
    descriptors.iter().map(to_model_tool).collect()
}
