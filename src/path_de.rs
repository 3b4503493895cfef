//! Deserialization that remembers where it failed.
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A serde failure with the JSON path of the offending node.
#[derive(Debug, Error)]
#[error("at JSON path {path} → {source}")]
pub struct PathDeError {
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}

pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathDeError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize(de).map_err(PathDeError::from)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PathDeError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(de).map_err(PathDeError::from)
}

impl From<serde_path_to_error::Error<serde_json::Error>> for PathDeError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        Self {
            path: err.path().to_string(),
            source: err.into_inner(),
        }
    }
}
