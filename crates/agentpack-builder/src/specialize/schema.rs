// ABOUTME: Fills a copy of the template tool schema from one agent descriptor.
// ABOUTME: Sets localized identity text, maps declared parameter types, and records the source back-reference.

use std::collections::HashSet;

use agentpack_core::naming;
use agentpack_core::{
    AgentDescriptor, Credential, LocalizedText, OutputParameter, ParameterSpec, SchemaParameter,
    ToolSchema,
};

use super::SpecializeError;
use crate::transliterate::Transliterator;

/// Declared registry types and the host wire type each maps to.
const TYPE_TABLE: &[(&str, &str)] = &[
    ("text", "string"),
    ("file", "string"),
    ("string", "string"),
    ("number", "number"),
    ("boolean", "boolean"),
];

/// Map a declared registry type to the host wire type.
pub fn map_parameter_type(declared: &str) -> Option<&'static str> {
    TYPE_TABLE
        .iter()
        .find(|(from, _)| *from == declared)
        .map(|(_, to)| *to)
}

pub fn specialize_schema(
    descriptor: &AgentDescriptor,
    index: usize,
    template: &ToolSchema,
    transliterator: &dyn Transliterator,
) -> Result<ToolSchema, SpecializeError> {
    let mut schema = template.clone();

    schema.identity.name = descriptor.id.clone();
    schema.identity.label = LocalizedText::new(
        transliterator.text(&descriptor.title),
        descriptor.title.clone(),
    );
    schema.description.human = LocalizedText::new(
        transliterator.text(&descriptor.description),
        descriptor.description.clone(),
    );
    schema.description.llm = descriptor.description.clone();

    let inputs = descriptor
        .inputs
        .iter()
        .map(|param| input_parameter(descriptor, param, transliterator))
        .collect::<Result<Vec<_>, _>>()?;
    ensure_unique(descriptor, inputs.iter().map(|p| p.name.as_str()))?;
    schema.parameters = if inputs.is_empty() { None } else { Some(inputs) };

    schema.out_parameters = descriptor
        .outputs
        .iter()
        .map(|param| output_parameter(descriptor, param))
        .collect::<Result<Vec<_>, _>>()?;
    ensure_unique(descriptor, schema.out_parameters.iter().map(|p| p.name.as_str()))?;

    match descriptor.credential() {
        Credential::ApiKey(key) => {
            schema.api_key = Some(key);
            schema.flow_id = None;
        }
        Credential::FlowId(flow) => {
            schema.flow_id = Some(flow);
            schema.api_key = None;
        }
    }
    schema.endpoint = descriptor.endpoint.clone();
    schema.extra.source = naming::source_path(index);

    Ok(schema)
}

fn wire_type(
    descriptor: &AgentDescriptor,
    param: &ParameterSpec,
) -> Result<String, SpecializeError> {
    map_parameter_type(&param.declared_type)
        .map(String::from)
        .ok_or_else(|| SpecializeError::UnknownParameterType {
            agent_id: descriptor.id.clone(),
            parameter: param.name.clone(),
            declared: param.declared_type.clone(),
        })
}

fn input_parameter(
    descriptor: &AgentDescriptor,
    param: &ParameterSpec,
    transliterator: &dyn Transliterator,
) -> Result<SchemaParameter, SpecializeError> {
    let localized = LocalizedText::new(
        transliterator.text(&param.description),
        param.description.clone(),
    );
    Ok(SchemaParameter {
        name: transliterator.identifier(&param.name),
        form: "llm".to_string(),
        human_description: localized.clone(),
        label: localized,
        llm_description: param.description.clone(),
        required: param.required,
        wire_type: wire_type(descriptor, param)?,
    })
}

fn output_parameter(
    descriptor: &AgentDescriptor,
    param: &ParameterSpec,
) -> Result<OutputParameter, SpecializeError> {
    // Output names are matched verbatim against artifact data keys, so they
    // are not transliterated.
    Ok(OutputParameter {
        name: param.name.clone(),
        required: param.required,
        description: param.description.clone(),
        wire_type: wire_type(descriptor, param)?,
    })
}

fn ensure_unique<'a>(
    descriptor: &AgentDescriptor,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), SpecializeError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(SpecializeError::DuplicateParameter {
                agent_id: descriptor.id.clone(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transliterate::DeunicodeTransliterator;

    fn template() -> ToolSchema {
        ToolSchema::from_yaml(
            r#"
identity:
  name: agent
  author: agentpack
  label:
    en_US: Agent
description:
  human:
    en_US: Template
  llm: Template
parameters: []
out_parameters: []
extra:
  source: _template/agent.rs
"#,
        )
        .unwrap()
    }

    fn spec(name: &str, declared: &str) -> ParameterSpec {
        ParameterSpec {
            name: name.to_string(),
            description: format!("{} input", name),
            required: true,
            declared_type: declared.to_string(),
        }
    }

    fn descriptor(inputs: Vec<ParameterSpec>) -> AgentDescriptor {
        AgentDescriptor {
            id: "planner".into(),
            title: "旅行规划".into(),
            description: "规划旅行路线".into(),
            inputs,
            outputs: vec![],
            api_key: Some("k-1".into()),
            flow_id: None,
            endpoint: Some("http://planner:8000".into()),
        }
    }

    #[test]
    fn fills_identity_and_localized_text() {
        let schema = specialize_schema(
            &descriptor(vec![spec("query", "text")]),
            2,
            &template(),
            &DeunicodeTransliterator,
        )
        .unwrap();

        assert_eq!(schema.identity.name, "planner");
        assert_eq!(schema.identity.author, "agentpack");
        assert_eq!(schema.identity.label.zh_hans.as_deref(), Some("旅行规划"));
        assert!(schema.identity.label.en_us.is_ascii());
        assert!(!schema.identity.label.en_us.is_empty());
        assert_eq!(schema.description.llm, "规划旅行路线");
        assert!(schema.description.human.en_us.is_ascii());
        assert_eq!(schema.extra.source, "tools/agent2.rs");
        assert_eq!(schema.api_key.as_deref(), Some("k-1"));
        assert_eq!(schema.endpoint.as_deref(), Some("http://planner:8000"));
    }

    #[test]
    fn maps_declared_types_and_transliterates_names() {
        let schema = specialize_schema(
            &descriptor(vec![
                spec("城市", "text"),
                spec("report", "file"),
                spec("days", "number"),
            ]),
            0,
            &template(),
            &DeunicodeTransliterator,
        )
        .unwrap();

        let params = schema.parameters.unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].name, "chengshi");
        assert_eq!(params[0].wire_type, "string");
        assert_eq!(params[1].wire_type, "string");
        assert_eq!(params[2].wire_type, "number");
        assert_eq!(params[0].form, "llm");
        assert_eq!(params[0].human_description.zh_hans.as_deref(), Some("城市 input"));
    }

    #[test]
    fn unknown_type_fails() {
        let err = specialize_schema(
            &descriptor(vec![spec("when", "datetime")]),
            0,
            &template(),
            &DeunicodeTransliterator,
        )
        .unwrap_err();

        match err {
            SpecializeError::UnknownParameterType { declared, parameter, .. } => {
                assert_eq!(declared, "datetime");
                assert_eq!(parameter, "when");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn no_inputs_records_explicit_marker() {
        let schema =
            specialize_schema(&descriptor(vec![]), 0, &template(), &DeunicodeTransliterator)
                .unwrap();
        assert!(schema.parameters.is_none());
        assert!(schema.to_yaml().unwrap().contains("parameters: null"));
    }

    #[test]
    fn names_colliding_after_transliteration_fail() {
        let err = specialize_schema(
            &descriptor(vec![spec("城市", "text"), spec("chengshi", "text")]),
            0,
            &template(),
            &DeunicodeTransliterator,
        )
        .unwrap_err();
        assert!(matches!(err, SpecializeError::DuplicateParameter { .. }));
    }

    #[test]
    fn flow_agents_get_outputs_and_flow_id() {
        let mut desc = descriptor(vec![spec("query", "text")]);
        desc.api_key = None;
        desc.flow_id = Some("flow-9".into());
        desc.outputs = vec![spec("result_a", "text")];

        let schema = specialize_schema(&desc, 1, &template(), &DeunicodeTransliterator).unwrap();
        assert_eq!(schema.flow_id.as_deref(), Some("flow-9"));
        assert!(schema.api_key.is_none());
        assert_eq!(schema.out_parameters.len(), 1);
        assert_eq!(schema.out_parameters[0].name, "result_a");
        assert_eq!(schema.out_parameters[0].wire_type, "string");
    }

    #[test]
    fn template_parameters_are_reset() {
        let mut tmpl = template();
        tmpl.out_parameters.push(OutputParameter {
            name: "stale".into(),
            required: false,
            description: String::new(),
            wire_type: "string".into(),
        });

        let schema = specialize_schema(
            &descriptor(vec![spec("q", "text")]),
            0,
            &tmpl,
            &DeunicodeTransliterator,
        )
        .unwrap();
        assert!(schema.out_parameters.is_empty());
    }
}
