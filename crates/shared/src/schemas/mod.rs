// crates/shared/src/schemas
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSchema>,
}

#[derive(Debug, Clone)]
pub struct ParameterSchema {
    pub name: &'static str,
    pub type_name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    pub fn to_tool(&self) -> Tool {
        let mut properties = json!({});
        let mut required = vec![];

        for param in &self.parameters {
            properties[param.name] = json!({
                "type": param.type_name,
                "description": param.description
            });
            if param.required {
                required.push(param.name);
            }
        }

        Tool {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name.to_string(),
                description: self.description.to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": properties,
                    "required": required
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_tool_lists_only_required_parameters() {
        let schema = ToolSchema {
            name: "record_user_details",
            description: "Use this tool to record user interest and email address",
            parameters: vec![
                ParameterSchema {
                    name: "email",
                    type_name: "string",
                    description: "User email",
                    required: true,
                },
                ParameterSchema {
                    name: "name",
                    type_name: "string",
                    description: "User name",
                    required: false,
                },
            ],
        };

        let tool = serde_json::to_value(schema.to_tool()).unwrap();
        assert_eq!(tool["type"], "function");
        assert_eq!(tool["function"]["name"], "record_user_details");
        assert_eq!(tool["function"]["parameters"]["required"], json!(["email"]));
        assert_eq!(
            tool["function"]["parameters"]["properties"]["name"]["description"],
            "User name"
        );
    }
}
