use serde::Serialize;
use serde_json::Value;

use crate::{error::ExecutionError, operation::Variables, response::Response};

/// State published to the presentation layer.
///
/// `loading` and `error` are never both set. `data` survives failures so the
/// last good result can still be displayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchState {
    pub data: Option<Value>,
    pub loading: bool,
    pub error: bool,
    pub variables: Variables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchStatus {
    /// The store had data for the operation when the controller was created.
    CachedIdle,
    /// Waiting for the first result of the current operation.
    Loading,
    /// Waiting for a result to merge into the current data.
    FetchingMore,
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(super) u64);

#[derive(Debug)]
pub enum Event {
    Next(Response),
    Error(ExecutionError),
    Complete,
}

/// An event tagged with the subscription that produced it.
#[derive(Debug)]
pub struct Notification {
    pub subscription: SubscriptionId,
    pub event: Event,
}

/// Second argument of a fetch-more merge function.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchMoreResult {
    pub fetch_more_result: Value,
}

/// Merges the data held before a fetch-more call with the newly fetched data.
pub type UpdateQuery = Box<dyn FnOnce(Value, FetchMoreResult) -> Value + Send>;

pub struct FetchMore {
    pub variables: Variables,
    pub update_query: UpdateQuery,
}

impl FetchMore {
    pub fn new(
        variables: Variables,
        update_query: impl FnOnce(Value, FetchMoreResult) -> Value + Send + 'static,
    ) -> Self {
        FetchMore {
            variables,
            update_query: Box::new(update_query),
        }
    }
}

impl std::fmt::Debug for FetchMore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchMore")
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

pub(super) struct PendingMerge {
    pub previous: Value,
    pub update_query: UpdateQuery,
}

impl PendingMerge {
    pub fn apply(self, fetch_more_result: Value) -> Value {
        (self.update_query)(self.previous, FetchMoreResult { fetch_more_result })
    }
}
