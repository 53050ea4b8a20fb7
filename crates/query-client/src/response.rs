use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExecutionError, ExecutionResult};

/// A GraphQL response as returned by an execution link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub message: String,
    /// Locations, path, extensions and anything else the server sent along.
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl Response {
    pub fn from_data(data: impl Into<Value>) -> Self {
        Response {
            data: Some(data.into()),
            ..Default::default()
        }
    }

    /// The `data` of the response, or an error if the server did not send any.
    pub fn into_data(self) -> ExecutionResult<Value> {
        match self.data {
            Some(data) if !data.is_null() => Ok(data),
            _ if self.errors.is_empty() => Err(ExecutionError::MissingData("no errors reported".into())),
            _ => Err(ExecutionError::MissingData(
                self.errors
                    .into_iter()
                    .map(|error| error.message)
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }
}
