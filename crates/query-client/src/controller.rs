//! The fetch lifecycle of a single query.
//!
//! A [`QueryController`] is bound to one query and follows its identity (name
//! and variables) over time. On every identity change it first looks at the
//! store and only opens a subscription through the link on a miss. Results
//! are written back to the store before being published.
//!
//! The controller never blocks. The host either awaits
//! [`QueryController::next_update`], which polls the active subscription, or
//! delivers notifications itself through [`QueryController::apply`]. Each
//! notification carries the id of the subscription it came from and anything
//! not coming from the current subscription is dropped, so a superseded
//! request can never overwrite the state of a newer one.

mod state;

use futures_util::{stream::BoxStream, StreamExt};
use serde_json::Value;
use tokio::sync::watch;

pub use self::state::{
    Event, FetchMore, FetchMoreResult, FetchState, FetchStatus, Notification, SubscriptionId, UpdateQuery,
};
use self::state::PendingMerge;
use crate::{
    client::Client,
    error::{ExecutionError, ExecutionResult, Result},
    operation::{Operation, OperationSource, Variables},
    response::Response,
};

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub variables: Option<Variables>,
}

impl QueryOptions {
    pub fn with_variables(variables: Variables) -> Self {
        QueryOptions {
            variables: Some(variables),
        }
    }
}

struct ActiveSubscription {
    id: SubscriptionId,
    stream: BoxStream<'static, ExecutionResult<Response>>,
}

pub struct QueryController {
    client: Client,
    source: OperationSource,
    operation: Operation,
    status: FetchStatus,
    state: FetchState,
    pending_merge: Option<PendingMerge>,
    subscription: Option<ActiveSubscription>,
    next_subscription_id: u64,
    last_error: Option<ExecutionError>,
    publisher: watch::Sender<FetchState>,
}

impl QueryController {
    /// Creates the controller and resolves its initial state.
    ///
    /// With data in the store the controller starts in [`FetchStatus::CachedIdle`]
    /// without touching the link, otherwise it starts loading.
    pub fn new(client: &Client, source: OperationSource, options: QueryOptions) -> Result<Self> {
        let operation = client.create_operation(&source, options.variables)?;
        let (publisher, _) = watch::channel(FetchState::default());

        let mut controller = QueryController {
            client: client.clone(),
            source,
            operation,
            status: FetchStatus::Loading,
            state: FetchState::default(),
            pending_merge: None,
            subscription: None,
            next_subscription_id: 0,
            last_error: None,
            publisher,
        };
        controller.resolve_identity(true);

        Ok(controller)
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn variables(&self) -> &Variables {
        &self.state.variables
    }

    /// Error behind the current [`FetchStatus::Failure`], if any.
    pub fn last_error(&self) -> Option<&ExecutionError> {
        self.last_error.as_ref()
    }

    /// Id of the subscription currently allowed to update the state.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription.as_ref().map(|subscription| subscription.id)
    }

    /// A receiver seeing every state published by this controller.
    pub fn watch(&self) -> watch::Receiver<FetchState> {
        self.publisher.subscribe()
    }

    /// Replaces the variables, fetching the new operation unless it is in the store.
    pub fn refetch(&mut self, variables: Variables) -> Result<()> {
        let operation = self.client.create_operation(&self.source, Some(variables))?;

        self.pending_merge = None;
        self.operation = operation;
        self.resolve_identity(false);

        Ok(())
    }

    /// Fetches the operation with new variables and merges the result into the
    /// data held right now.
    ///
    /// The current data stays published while the next page loads.
    pub fn fetch_more(&mut self, FetchMore { variables, update_query }: FetchMore) -> Result<()> {
        let operation = self.client.create_operation(&self.source, Some(variables))?;

        self.pending_merge = Some(PendingMerge {
            previous: self.state.data.clone().unwrap_or(Value::Null),
            update_query,
        });
        self.operation = operation;
        self.resolve_identity(false);

        Ok(())
    }

    /// Waits for the next notification of the active subscription and applies it.
    ///
    /// Returns `None` when no subscription is active.
    pub async fn next_update(&mut self) -> Option<&FetchState> {
        let subscription = self.subscription.as_mut()?;
        let id = subscription.id;

        let event = match subscription.stream.next().await {
            Some(Ok(response)) => Event::Next(response),
            Some(Err(error)) => Event::Error(error),
            None => Event::Complete,
        };

        self.apply(Notification { subscription: id, event });

        Some(&self.state)
    }

    /// Applies a notification, returning whether the published state changed.
    ///
    /// Notifications of any subscription but the current one are ignored.
    pub fn apply(&mut self, Notification { subscription, event }: Notification) -> bool {
        if self.subscription_id() != Some(subscription) {
            tracing::trace!(?subscription, "ignoring notification of a superseded subscription");
            return false;
        }

        match event {
            Event::Next(response) => match response.into_data() {
                Ok(data) => self.succeed(data),
                Err(error) => self.fail(error),
            },
            Event::Error(error) => {
                self.subscription = None;
                self.fail(error)
            }
            Event::Complete => {
                tracing::debug!(?subscription, operation = self.operation.name(), "subscription completed");
                self.subscription = None;

                match self.status {
                    FetchStatus::Loading | FetchStatus::FetchingMore => {
                        self.fail(ExecutionError::any("the link completed without a response"))
                    }
                    _ => false,
                }
            }
        }
    }

    /// Tears the controller down, cancelling any running request.
    pub fn dispose(mut self) {
        self.cancel();
    }

    fn resolve_identity(&mut self, initial: bool) {
        self.cancel();
        self.state.variables = self.operation.variables().clone();

        if let Some(cached) = self.client.store().get(&self.operation).filter(|cached| !cached.is_null()) {
            tracing::debug!(fingerprint = %self.operation.fingerprint(), "cache hit");

            let data = match self.pending_merge.take() {
                Some(merge) => merge.apply(cached),
                None => cached,
            };

            self.status = if initial {
                FetchStatus::CachedIdle
            } else {
                FetchStatus::Success
            };
            self.state.data = Some(data);
            self.state.loading = false;
            self.state.error = false;
            self.last_error = None;
        } else {
            tracing::debug!(fingerprint = %self.operation.fingerprint(), "cache miss");

            self.status = if self.pending_merge.is_some() {
                FetchStatus::FetchingMore
            } else {
                FetchStatus::Loading
            };
            self.state.loading = self.status == FetchStatus::Loading;
            self.state.error = false;
            self.open_subscription();
        }

        self.publish();
    }

    fn open_subscription(&mut self) {
        let id = SubscriptionId(self.next_subscription_id);
        self.next_subscription_id += 1;

        tracing::debug!(subscription = ?id, operation = self.operation.name(), "opening subscription");

        let stream = self.client.link().subscribe(&self.operation);
        self.subscription = Some(ActiveSubscription { id, stream });
    }

    fn cancel(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            tracing::debug!(subscription = ?subscription.id, "cancelling subscription");
        }
    }

    fn succeed(&mut self, data: Value) -> bool {
        self.client.store().set(&self.operation, data.clone());

        let data = match self.pending_merge.take() {
            Some(merge) => merge.apply(data),
            None => data,
        };

        self.status = FetchStatus::Success;
        self.state.data = Some(data);
        self.state.loading = false;
        self.state.error = false;
        self.last_error = None;
        self.publish();

        true
    }

    fn fail(&mut self, error: ExecutionError) -> bool {
        tracing::warn!(operation = self.operation.name(), %error, "operation failed");

        self.pending_merge = None;
        self.status = FetchStatus::Failure;
        self.state.loading = false;
        self.state.error = true;
        self.last_error = Some(error);
        self.publish();

        true
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }
}

impl std::fmt::Debug for QueryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryController")
            .field("operation", &self.operation.name())
            .field("status", &self.status)
            .field("subscription", &self.subscription_id())
            .finish_non_exhaustive()
    }
}
