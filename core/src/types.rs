//! Wire schema for the mind-map API.
//!
//! # Design
//! Resources coming back from the server are mapped through these structs so
//! required fields (`_id`, `text`, `offset`) are checked once, at the parse
//! boundary. They are defined independently of the mock-server crate; the
//! integration tests catch drift between the two.

use serde::{Deserialize, Serialize};

/// Position of a node relative to its parent. `x` runs along the branch,
/// `y` is vertical.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A diagram as returned by `POST /api/1/diagrams`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagramResource {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// A node as returned by the node endpoints. `children` is only present on
/// tree-shaped listings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeResource {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    pub offset: Offset,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeResource>,
}

/// Request payload for creating a diagram.
#[derive(Debug, Clone, Serialize)]
pub struct CreateDiagram {
    pub title: String,
}

/// Request payload for adding a node under an existing parent.
#[derive(Debug, Clone, Serialize)]
pub struct NewNode {
    pub parent: String,
    pub offset: Offset,
    pub text: String,
}

/// Partial update of a node. Only the fields that are set are sent; omitted
/// fields are left unchanged on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Offset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn offset(mut self, offset: Offset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Body of a non-2xx response. `description` is what the service sends;
/// `details` is accepted from older deployments.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}
