//! Value serialization seam

use serde::{de::DeserializeOwned, Serialize};

use crate::domain::BoxError;

/// Converts values to and from the raw string form stored in the backing
/// store. The default is JSON; callers override this seam when a domain needs
/// a different wire form.
pub trait ValueCodec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<String, BoxError>;
    fn decode(&self, raw: &str) -> Result<T, BoxError>;
}

/// Default JSON codec backed by serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> ValueCodec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<String, BoxError> {
        serde_json::to_string(value).map_err(Into::into)
    }

    fn decode(&self, raw: &str) -> Result<T, BoxError> {
        serde_json::from_str(raw).map_err(Into::into)
    }
}
