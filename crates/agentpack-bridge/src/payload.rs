// ABOUTME: Builds the A2A message/send parameters for one tool call.
// ABOUTME: Inputs are classified as file references or text by their extension.

use agentpack_core::{AgentVariant, Credential};
use serde_json::{Value, json};
use ulid::Ulid;

use crate::config::ToolConfig;
use crate::message::ToolParameters;

/// Value suffixes treated as document references rather than text.
pub const FILE_EXTENSIONS: [&str; 17] = [
    ".txt", ".md", ".mdx", ".markdown", ".pdf", ".html", ".xlsx", ".xls", ".doc", ".docx", ".csv",
    ".eml", ".msg", ".pptx", ".ppt", ".xml", ".epub",
];

pub const ACCEPTED_OUTPUT_MODES: [&str; 2] = ["text/plain", "application/json"];

/// Caller identity attached to API-key requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

/// `file` when the value names a document, `text` otherwise.
pub fn classify_value(value: &str) -> &'static str {
    let lower = value.to_lowercase();
    if FILE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        "file"
    } else {
        "text"
    }
}

/// Build the `params` object of a `message/stream` request.
pub fn build_request(config: &ToolConfig, parameters: &ToolParameters, session: &Session) -> Value {
    let inputs: Vec<Value> = config
        .inputs
        .iter()
        .map(|input| {
            let value = parameters.get(&input.name);
            json!({
                "name": input.name,
                "type": classify_value(value.map(String::as_str).unwrap_or_default()),
                "value": value,
                "description": input.human_description.en_us,
                "required": input.required,
            })
        })
        .collect();

    let mut data = json!({ "inputs": inputs });

    if config.variant == AgentVariant::Outputs {
        let outputs: Vec<Value> = config
            .outputs
            .iter()
            .map(|output| {
                let value = parameters.get(&output.name).map(String::as_str);
                json!({
                    "name": output.name,
                    "type": classify_value(value.unwrap_or_default()),
                    "value": "",
                    "description": output.description,
                    "required": output.required,
                })
            })
            .collect();
        data["outputs"] = Value::Array(outputs);
    }

    data["agent_request_params"] = match &config.credential {
        Credential::ApiKey(api_key) => json!({ "api_key": api_key, "user_id": session.user_id }),
        Credential::FlowId(flow_id) => json!({ "flow_id": flow_id }),
    };

    json!({
        "message": {
            "kind": "message",
            "role": "user",
            "messageId": Ulid::new().to_string(),
            "parts": [{ "kind": "data", "data": data }],
        },
        "configuration": {
            "blocking": false,
            "acceptedOutputModes": ACCEPTED_OUTPUT_MODES,
        },
    })
}
