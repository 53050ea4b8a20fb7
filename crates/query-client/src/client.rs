use serde_json::Value;

use crate::{
    error::{ExecutionResult, Result},
    link::Link,
    operation::{Operation, OperationSource, Variables},
    store::{CacheSnapshot, Store},
};

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Store content to start from, usually dehydrated by another process.
    pub initial_state: Option<CacheSnapshot>,
}

/// Entry point of the library: an execution link and the store shared by
/// every controller created from this client.
#[derive(Clone)]
pub struct Client {
    link: Link,
    store: Store,
}

impl Client {
    pub fn new(link: Link) -> Self {
        Self::with_config(link, ClientConfig::default())
    }

    pub fn with_config(link: Link, config: ClientConfig) -> Self {
        let store = config.initial_state.map(Store::from).unwrap_or_default();
        tracing::debug!(entries = store.len(), "created client");

        Client { link, store }
    }

    pub fn builder(link: Link) -> ClientBuilder {
        ClientBuilder {
            link,
            config: ClientConfig::default(),
        }
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn create_operation(&self, source: &OperationSource, variables: Option<Variables>) -> Result<Operation> {
        Operation::build(source, variables)
    }

    /// Executes `operation` once and writes its data to the store.
    ///
    /// Used to fill the store ahead of time, before dehydrating it with [`Client::extract`].
    pub async fn load(&self, operation: &Operation) -> ExecutionResult<Option<Value>> {
        let response = self.link.execute_once(operation).await?;

        match response.data {
            Some(data) if !data.is_null() => {
                self.store.set(operation, data.clone());
                Ok(Some(data))
            }
            _ => {
                tracing::debug!(operation = operation.name(), "loaded operation without data");
                Ok(None)
            }
        }
    }

    pub fn extract(&self) -> CacheSnapshot {
        self.store.snapshot()
    }
}

pub struct ClientBuilder {
    link: Link,
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn initial_state(mut self, snapshot: CacheSnapshot) -> Self {
        self.config.initial_state = Some(snapshot);
        self
    }

    pub fn build(self) -> Client {
        Client::with_config(self.link, self.config)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("store", &self.store).finish_non_exhaustive()
    }
}
