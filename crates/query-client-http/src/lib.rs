//! An [`ExecutionLink`](query_client::ExecutionLink) posting operations to a
//! GraphQL server over HTTP.

mod config;
mod link;

pub use self::{config::HttpLinkConfig, link::HttpLink};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not build the HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
