//! A caching GraphQL client.
//!
//! Operations are built from either a parsed document or composed query text
//! (see [`text`]). Each operation is identified by a [`Fingerprint`] made of its
//! name and variables, which keys the results kept in the client [`Store`].
//!
//! Presentation code drives one [`QueryController`] per displayed query. The
//! controller serves results from the store when it can and otherwise executes
//! the operation through the client's [`ExecutionLink`], publishing a
//! [`FetchState`] after every change.
//!
//! Nothing here performs I/O by itself: the transport is whatever link the
//! client was created with.

mod client;
mod controller;
mod error;
mod link;
mod operation;
mod response;
mod store;
pub mod text;

pub use self::{
    client::{Client, ClientBuilder, ClientConfig},
    controller::{
        Event, FetchMore, FetchMoreResult, FetchState, FetchStatus, Notification, QueryController, QueryOptions,
        SubscriptionId, UpdateQuery,
    },
    error::{Error, ExecutionError, ExecutionResult, Result},
    link::{ExecutionLink, Link},
    operation::{Document, Operation, OperationKind, OperationSource, OperationType, Query, RequestBody, Variables},
    response::{Response, ResponseError},
    store::{CacheSnapshot, Fingerprint, Store},
    text::{FragmentNode, TextOperation},
};
