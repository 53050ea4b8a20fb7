use std::{borrow::Cow, sync::Arc};

use graphql_parser::query::{Definition, OperationDefinition};
use serde::Serialize;

use crate::{
    error::{Error, Result},
    store::Fingerprint,
    text::{Composed, TextOperation},
};

/// Variables of an operation, keyed by name.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// A parsed GraphQL document.
pub type Document = graphql_parser::query::Document<'static, String>;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
    Fragment,
}

/// Which kind of source an [`Operation`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OperationKind {
    StructuredDocument,
    Text,
}

/// Everything an operation can be built from.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationSource {
    Document(Arc<Document>),
    Text(TextOperation),
}

impl OperationSource {
    /// Parses `text` into a structured document.
    pub fn parse_document(text: &str) -> Result<Self> {
        let document = graphql_parser::parse_query::<String>(text).map_err(|err| Error::Parse(err.to_string()))?;
        Ok(OperationSource::Document(Arc::new(document.into_static())))
    }
}

impl From<Document> for OperationSource {
    fn from(document: Document) -> Self {
        OperationSource::Document(Arc::new(document))
    }
}

impl From<TextOperation> for OperationSource {
    fn from(operation: TextOperation) -> Self {
        OperationSource::Text(operation)
    }
}

impl TryFrom<Composed> for OperationSource {
    type Error = Error;

    fn try_from(composed: Composed) -> Result<Self> {
        composed.into_operation().map(OperationSource::Text)
    }
}

/// The executable document of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Document(Arc<Document>),
    Text(Arc<str>),
}

impl Query {
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Query::Document(document) => Cow::Owned(document.to_string()),
            Query::Text(text) => Cow::Borrowed(text.as_ref()),
        }
    }
}

/// Canonical representation of an operation and its variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    name: String,
    operation_type: OperationType,
    kind: OperationKind,
    query: Query,
    variables: Variables,
}

impl Operation {
    /// Builds the canonical operation for `source`.
    ///
    /// Missing variables default to an empty map. Building twice from the same
    /// inputs gives equal operations.
    pub fn build(source: &OperationSource, variables: Option<Variables>) -> Result<Operation> {
        let variables = variables.unwrap_or_default();

        match source {
            OperationSource::Document(document) => {
                let (name, operation_type) = document_header(document)?;

                Ok(Operation {
                    name: name.ok_or(Error::MissingName)?,
                    operation_type,
                    kind: OperationKind::StructuredDocument,
                    query: Query::Document(Arc::clone(document)),
                    variables,
                })
            }
            OperationSource::Text(text) => {
                let name = text.name.clone().filter(|name| !name.is_empty()).ok_or(Error::MissingName)?;
                let operation_type = text.operation_type.ok_or_else(|| {
                    Error::UnrecognizedSource(format!("operation '{name}' does not start with a known keyword").into())
                })?;

                Ok(Operation {
                    name,
                    operation_type,
                    kind: OperationKind::Text,
                    query: Query::Text(Arc::from(text.query.as_str())),
                    variables,
                })
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_parts(&self.name, &self.variables)
    }

    /// The body sent to a GraphQL server for this operation.
    pub fn request_body(&self) -> RequestBody<'_> {
        RequestBody {
            query: self.query.to_text(),
            variables: &self.variables,
            operation_name: &self.name,
        }
    }
}

/// Wire shape of a single GraphQL request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody<'a> {
    pub query: Cow<'a, str>,
    pub variables: &'a Variables,
    pub operation_name: &'a str,
}

fn document_header(document: &Document) -> Result<(Option<String>, OperationType)> {
    let Some(definition) = document.definitions.first() else {
        return Err(Error::UnrecognizedSource("the document has no definitions".into()));
    };

    Ok(match definition {
        Definition::Fragment(fragment) => (Some(fragment.name.clone()), OperationType::Fragment),
        Definition::Operation(OperationDefinition::SelectionSet(_)) => (None, OperationType::Query),
        Definition::Operation(OperationDefinition::Query(query)) => (query.name.clone(), OperationType::Query),
        Definition::Operation(OperationDefinition::Mutation(mutation)) => {
            (mutation.name.clone(), OperationType::Mutation)
        }
        Definition::Operation(OperationDefinition::Subscription(_)) => {
            return Err(Error::UnsupportedOperationType("subscription".into()))
        }
    })
}
