use serde_json::{Map, Value};

use crate::core::errors::RagError;

pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(app) = expect_optional_object(root, "app")? {
        validate_required_string_field_if_present(app, "app.documents_dir", "documents_dir")?;
        validate_required_string_field_if_present(app, "app.index_path", "index_path")?;
        validate_enum_field(app, "app.routing", "routing", &["fixed", "planner"])?;
        validate_u64_field(
            app,
            "app.max_question_chars",
            "max_question_chars",
            1,
            100_000,
        )?;
        validate_u64_field(app, "app.graph_max_steps", "graph_max_steps", 1, 100)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 50)?;
        validate_u64_field(retrieval, "retrieval.chunk_size", "chunk_size", 50, 20_000)?;
        validate_u64_field(
            retrieval,
            "retrieval.chunk_overlap",
            "chunk_overlap",
            0,
            20_000,
        )?;
        validate_u64_field(
            retrieval,
            "retrieval.embed_batch_size",
            "embed_batch_size",
            1,
            2048,
        )?;
        validate_string_array_field(
            retrieval,
            "retrieval.document_extensions",
            "document_extensions",
        )?;
        validate_overlap_below_size(retrieval)?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_required_string_field_if_present(llm, "llm.base_url", "base_url")?;
        validate_required_string_field_if_present(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 1_000_000)?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 600)?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_enum_field(
            embedding,
            "embedding.provider",
            "provider",
            &["openai", "hashing"],
        )?;
        validate_required_string_field_if_present(embedding, "embedding.model", "model")?;
        validate_u64_field(embedding, "embedding.dimensions", "dimensions", 8, 4096)?;
    }

    Ok(())
}

fn validate_overlap_below_size(retrieval: &Map<String, Value>) -> Result<(), RagError> {
    let size = retrieval
        .get("chunk_size")
        .and_then(Value::as_u64)
        .unwrap_or(1000);
    let overlap = retrieval
        .get("chunk_overlap")
        .and_then(Value::as_u64)
        .unwrap_or(100);
    if overlap >= size {
        return Err(RagError::Config(format!(
            "Invalid config at 'retrieval.chunk_overlap': must be smaller than chunk_size ({})",
            size
        )));
    }
    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, RagError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if !(min..=max).contains(&number) {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_required_string_field_if_present(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    if items.is_empty() {
        return Err(RagError::Config(format!(
            "Invalid config at '{}': at least one entry is required",
            path
        )));
    }
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(RagError::Config(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> RagError {
    RagError::Config(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(result: Result<(), RagError>) -> String {
        match result {
            Err(RagError::Config(message)) => message,
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn empty_config_is_valid() {
        assert!(validate_config(&json!({})).is_ok());
    }

    #[test]
    fn full_config_is_valid() {
        let config = json!({
            "app": { "routing": "planner", "max_question_chars": 500, "graph_max_steps": 8 },
            "retrieval": { "top_k": 3, "chunk_size": 400, "chunk_overlap": 40, "document_extensions": ["txt", "md"] },
            "llm": { "model": "gpt-4o-mini", "temperature": 0.0, "max_tokens": 256, "api_key": null },
            "embedding": { "provider": "hashing", "dimensions": 128 }
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn non_object_root_is_rejected() {
        let msg = message(validate_config(&json!([1, 2])));
        assert!(msg.contains("'root'"));
    }

    #[test]
    fn top_k_out_of_range_is_rejected() {
        let msg = message(validate_config(&json!({ "retrieval": { "top_k": 0 } })));
        assert!(msg.contains("retrieval.top_k"));
    }

    #[test]
    fn overlap_must_be_below_chunk_size() {
        let msg = message(validate_config(&json!({
            "retrieval": { "chunk_size": 100, "chunk_overlap": 100 }
        })));
        assert!(msg.contains("chunk_overlap"));

        let msg = message(validate_config(&json!({ "retrieval": { "chunk_overlap": 1000 } })));
        assert!(msg.contains("chunk_overlap"));
    }

    #[test]
    fn unknown_routing_mode_is_rejected() {
        let msg = message(validate_config(&json!({ "app": { "routing": "random" } })));
        assert!(msg.contains("fixed, planner"));
    }

    #[test]
    fn temperature_must_be_numeric_and_bounded() {
        let msg = message(validate_config(&json!({ "llm": { "temperature": "hot" } })));
        assert!(msg.contains("expected number"));

        let msg = message(validate_config(&json!({ "llm": { "temperature": 3.5 } })));
        assert!(msg.contains("between 0 and 2"));
    }

    #[test]
    fn empty_extension_list_is_rejected() {
        let msg = message(validate_config(&json!({
            "retrieval": { "document_extensions": [] }
        })));
        assert!(msg.contains("document_extensions"));
    }

    #[test]
    fn section_must_be_an_object() {
        let msg = message(validate_config(&json!({ "embedding": "openai" })));
        assert!(msg.contains("'embedding': expected object"));
    }
}
