//! Processing of raw GraphQL operation text.
//!
//! Operations are written as a literal followed by references to fragment
//! definitions. Fragments can themselves reference other fragments, so the
//! references form a tree which gets flattened and deduplicated before being
//! appended to the operation text. Servers reject documents defining the same
//! fragment twice, so a fragment reached through several paths must only be
//! emitted once.

use std::sync::OnceLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::{
    error::{Error, Result},
    operation::OperationType,
};

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(fragment|query|mutation) (\w*)( |\()").expect("must be correct"))
}

/// Type and name found at the start of an operation text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub operation_type: Option<OperationType>,
    pub name: Option<String>,
}

/// Extracts the leading keyword and identifier of an operation text.
///
/// Text not matching `<keyword> <name>` yields an empty header. An empty
/// identifier is reported as a missing name.
pub fn parse_header(text: &str) -> Header {
    let Some(captures) = header_pattern().captures(text) else {
        return Header::default();
    };

    Header {
        operation_type: captures.get(1).and_then(|keyword| keyword.as_str().parse().ok()),
        name: captures
            .get(2)
            .map(|name| name.as_str())
            .filter(|name| !name.is_empty())
            .map(str::to_string),
    }
}

/// A fragment definition along with the fragments it references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentNode {
    body: String,
    children: Vec<FragmentNode>,
}

impl FragmentNode {
    pub fn new(body: impl Into<String>, children: Vec<FragmentNode>) -> Self {
        FragmentNode {
            body: body.into(),
            children,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn children(&self) -> &[FragmentNode] {
        &self.children
    }

    pub fn name(&self) -> Option<String> {
        parse_header(&self.body).name
    }
}

/// Operation text with all of its fragments appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOperation {
    pub name: Option<String>,
    pub operation_type: Option<OperationType>,
    pub query: String,
}

/// Output of [`compose`]: fragments stay composable, anything else is executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composed {
    Fragment(FragmentNode),
    Operation(TextOperation),
}

impl Composed {
    pub fn into_fragment(self) -> Result<FragmentNode> {
        match self {
            Composed::Fragment(fragment) => Ok(fragment),
            Composed::Operation(operation) => Err(Error::UnrecognizedSource(
                format!(
                    "expected a fragment definition, found {}",
                    operation.name.as_deref().unwrap_or("an unnamed operation")
                )
                .into(),
            )),
        }
    }

    pub fn into_operation(self) -> Result<TextOperation> {
        match self {
            Composed::Operation(operation) => Ok(operation),
            Composed::Fragment(_) => Err(Error::UnsupportedOperationType(OperationType::Fragment.to_string())),
        }
    }
}

/// Composes an operation text from its literal segments and the fragments
/// interpolated between them.
///
/// Fragments may only be referenced at clause boundaries, so every segment
/// after the first one must be non-empty whitespace.
pub fn compose<S: AsRef<str>>(segments: &[S], fragments: Vec<FragmentNode>) -> Result<Composed> {
    if segments.len() != fragments.len() + 1 {
        return Err(Error::SegmentMismatch {
            expected: fragments.len() + 1,
            actual: segments.len(),
        });
    }

    for (segment, text) in segments.iter().enumerate().skip(1) {
        let text = text.as_ref();
        if text.is_empty() || !text.chars().all(char::is_whitespace) {
            return Err(Error::ExpectedWhitespace {
                segment,
                text: text.to_string(),
            });
        }
    }

    let literal = segments[0].as_ref();
    let Header { operation_type, name } = parse_header(literal);

    if operation_type == Some(OperationType::Fragment) {
        return Ok(Composed::Fragment(FragmentNode::new(literal, fragments)));
    }

    let bodies = flatten(&fragments);
    let mut query = String::with_capacity(literal.len() + bodies.iter().map(|body| body.len() + 1).sum::<usize>());
    query.push_str(literal);
    query.push(' ');
    query.push_str(&bodies.into_iter().collect::<Vec<_>>().join(" "));

    Ok(Composed::Operation(TextOperation {
        name,
        operation_type,
        query,
    }))
}

/// Depth-first walk over the fragment tree, keeping the first occurrence of each body.
fn flatten(fragments: &[FragmentNode]) -> IndexSet<&str> {
    let mut bodies = IndexSet::new();
    let mut stack = fragments.iter().rev().collect::<Vec<_>>();

    while let Some(fragment) = stack.pop() {
        bodies.insert(fragment.body.as_str());
        stack.extend(fragment.children.iter().rev());
    }

    bodies
}

/// Composes query text from alternating literal segments and fragments.
///
/// ```ignore
/// let user = gql!("fragment UserFields on User { id name }")?.into_fragment()?;
/// let query = gql!("query Viewer { viewer { ...UserFields } }", user, "\n")?;
/// ```
#[macro_export]
macro_rules! gql {
    ($literal:expr $(, $fragment:expr, $segment:expr)* $(,)?) => {
        $crate::text::compose(
            &[$literal $(, $segment)*],
            ::std::vec![$(::std::clone::Clone::clone(&$fragment)),*],
        )
    };
}
