use crate::utils::error::DiscoveryError;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

/// Types the model can be asked to produce directly.
///
/// Implemented for anything that is `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// JSON schema with every `$ref` inlined and the draft metadata removed,
    /// since response-schema endpoints only accept self-contained schemas.
    fn response_schema() -> serde_json::Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        inline_refs(&mut value);

        if let serde_json::Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }

    /// Parse model output, tolerating a markdown code fence around the JSON.
    fn from_model_output(text: &str) -> Result<Self, DiscoveryError> {
        serde_json::from_str(strip_code_blocks(text))
            .map_err(|e| DiscoveryError::malformed(Self::type_name(), e.to_string()))
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn inline_refs(value: &mut serde_json::Value) {
    let definitions = match value {
        serde_json::Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };

    if let Some(defs) = definitions {
        inline_refs_recursive(value, &defs);
    }
}

fn inline_refs_recursive(value: &mut serde_json::Value, definitions: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(def) = ref_path
                    .strip_prefix("#/definitions/")
                    .and_then(|name| definitions.get(name))
                {
                    *value = def.clone();
                    inline_refs_recursive(value, definitions);
                    return;
                }
            }

            // schemars wraps documented refs as `allOf: [{$ref}]`
            if let Some(serde_json::Value::Array(all_of)) = map.get("allOf").cloned() {
                if let [single] = all_of.as_slice() {
                    let mut inner = single.clone();
                    inline_refs_recursive(&mut inner, definitions);
                    map.remove("allOf");
                    if let serde_json::Value::Object(inner_map) = inner {
                        for (k, v) in inner_map {
                            map.entry(k).or_insert(v);
                        }
                    }
                }
            }

            for (_, v) in map.iter_mut() {
                inline_refs_recursive(v, definitions);
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_recursive(item, definitions);
            }
        }
        _ => {}
    }
}
