use serde::de::DeserializeOwned;
use thiserror::Error;

/// A deserialization failure located by its JSON path (`data.__schema.types[3].kind`).
#[derive(Debug, Error)]
#[error("at JSON path {path} → {message}")]
pub struct JsonPathError {
    pub path: String,
    pub message: String,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, JsonPathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| JsonPathError {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

/// Same as [`from_str_with_path`] for an already parsed value.
pub fn from_value_with_path<T: DeserializeOwned>(
    value: &serde_json::Value,
) -> Result<T, JsonPathError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| JsonPathError {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}
