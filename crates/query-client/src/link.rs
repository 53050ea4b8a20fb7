use std::sync::Arc;

use futures_util::{stream::BoxStream, StreamExt};

use crate::{
    error::{ExecutionError, ExecutionResult},
    operation::Operation,
    response::Response,
};

/// Transport executing operations against a GraphQL server.
#[async_trait::async_trait]
pub trait ExecutionLink: Send + Sync {
    /// Starts executing `operation`, yielding every response the server sends.
    ///
    /// The stream ends after the last response or after an error. Dropping it
    /// cancels the execution.
    fn subscribe(&self, operation: &Operation) -> BoxStream<'static, ExecutionResult<Response>>;

    /// Executes `operation` and returns its first response.
    async fn execute_once(&self, operation: &Operation) -> ExecutionResult<Response> {
        self.subscribe(operation)
            .next()
            .await
            .unwrap_or_else(|| Err(ExecutionError::any("the link completed without a response")))
    }
}

#[derive(Clone)]
pub struct Link {
    inner: Arc<dyn ExecutionLink>,
}

impl Link {
    pub fn new(link: impl ExecutionLink + 'static) -> Link {
        Link { inner: Arc::new(link) }
    }
}

impl std::ops::Deref for Link {
    type Target = dyn ExecutionLink;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}
