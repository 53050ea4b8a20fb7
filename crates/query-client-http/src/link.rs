use futures_util::{stream::BoxStream, FutureExt, StreamExt};
use query_client::{ExecutionError, ExecutionLink, ExecutionResult, Link, Operation, Response};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::{Error, HttpLinkConfig};

/// Executes operations as GraphQL-over-HTTP POST requests.
///
/// Every operation results in exactly one request and one response, so the
/// subscription streams yield a single item.
pub struct HttpLink {
    client: reqwest::Client,
    url: Url,
}

impl HttpLink {
    pub fn new(config: HttpLinkConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(HttpLink { client, url: config.url })
    }

    /// Builds the link and wraps it for a [`query_client::Client`].
    pub fn runtime_link(config: HttpLinkConfig) -> Result<Link, Error> {
        Self::new(config).map(Link::new)
    }

    fn request(&self, operation: &Operation) -> impl std::future::Future<Output = ExecutionResult<Response>> {
        let body = serde_json::to_vec(&operation.request_body()).map_err(ExecutionError::any);
        let client = self.client.clone();
        let url = self.url.clone();
        let operation_name = operation.name().to_string();

        async move {
            tracing::debug!(%url, operation = %operation_name, "sending operation");
            post(client, url, body?).await
        }
    }
}

async fn post(client: reqwest::Client, url: Url, body: Vec<u8>) -> ExecutionResult<Response> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .body(body)
        .send()
        .await
        .map_err(ExecutionError::any)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExecutionError::AnyError(format!(
            "The GraphQL server responded with status {status}"
        )));
    }

    response.json::<Response>().await.map_err(ExecutionError::any)
}

#[async_trait::async_trait]
impl ExecutionLink for HttpLink {
    fn subscribe(&self, operation: &Operation) -> BoxStream<'static, ExecutionResult<Response>> {
        futures_util::stream::once(self.request(operation).boxed()).boxed()
    }

    async fn execute_once(&self, operation: &Operation) -> ExecutionResult<Response> {
        self.request(operation).await
    }
}
