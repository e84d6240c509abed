//! In-memory stand-in for the mind-map service's `/api/1` endpoints.
//!
//! Diagrams live in a `HashMap` behind a tokio `RwLock`; nodes are kept per
//! diagram in insertion order with a `parent` link and are reassembled into
//! nested trees on every listing. Every route requires an `access_token`
//! query parameter; when the server is built with a token, it must match.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const MAX_TEXT_CHARS: usize = 3000;

/// Horizontal distance between a parent and its children after `arrange`.
pub const ARRANGE_X: f64 = 150.0;
/// Vertical space reserved per leaf after `arrange`.
pub const ARRANGE_ROW: f64 = 60.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    pub offset: Offset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

#[derive(Deserialize)]
pub struct CreateDiagram {
    pub title: String,
}

#[derive(Deserialize)]
pub struct CreateNode {
    pub parent: String,
    #[serde(default)]
    pub offset: Offset,
    pub text: String,
}

#[derive(Deserialize)]
pub struct UpdateNode {
    pub parent: Option<String>,
    pub offset: Option<Offset>,
    pub text: Option<String>,
}

#[derive(Deserialize)]
pub struct AuthQuery {
    pub access_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
}

/// Error returned by handlers, rendered as `{"description": ...}`.
#[derive(Debug)]
pub enum ServiceError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, description) = match self {
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServiceError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServiceError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
        };
        (status, Json(serde_json::json!({ "description": description }))).into_response()
    }
}

#[derive(Clone, Debug)]
struct NodeRecord {
    id: String,
    text: String,
    offset: Offset,
    parent: Option<String>,
}

impl NodeRecord {
    fn to_node(&self) -> Node {
        Node {
            id: self.id.clone(),
            text: self.text.clone(),
            offset: self.offset,
            parent: self.parent.clone(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct DiagramRecord {
    title: String,
    nodes: Vec<NodeRecord>,
}

impl DiagramRecord {
    fn find(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut NodeRecord> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a NodeRecord> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent.as_deref() == Some(id))
    }

    fn subtree(&self, record: &NodeRecord) -> Node {
        let mut node = record.to_node();
        node.children = self
            .children_of(&record.id)
            .map(|child| self.subtree(child))
            .collect();
        node
    }

    fn tree(&self) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .map(|root| self.subtree(root))
            .collect()
    }

    /// `id` plus every node below it.
    fn subtree_ids(&self, id: &str) -> HashSet<String> {
        let mut ids = HashSet::from([id.to_string()]);
        let mut pending = vec![id.to_string()];
        while let Some(current) = pending.pop() {
            for child in self.children_of(&current) {
                if ids.insert(child.id.clone()) {
                    pending.push(child.id.clone());
                }
            }
        }
        ids
    }

    fn leaf_count(&self, id: &str) -> usize {
        let count: usize = self.children_of(id).map(|c| self.leaf_count(&c.id)).sum();
        count.max(1)
    }

    /// Tidy layout: children sit `ARRANGE_X` away on the side they were
    /// already on, stacked vertically in bands proportional to their leaf
    /// count and centred on the parent.
    fn arrange(&mut self) {
        let mut placed = Vec::new();
        for parent in &self.nodes {
            let children: Vec<&NodeRecord> = self.children_of(&parent.id).collect();
            if children.is_empty() {
                continue;
            }
            let total: usize = children.iter().map(|c| self.leaf_count(&c.id)).sum();
            let mut cursor = -(total as f64) * ARRANGE_ROW / 2.0;
            for child in children {
                let span = self.leaf_count(&child.id) as f64 * ARRANGE_ROW;
                let x = if child.offset.x < 0.0 { -ARRANGE_X } else { ARRANGE_X };
                placed.push((child.id.clone(), Offset { x, y: cursor + span / 2.0 }));
                cursor += span;
            }
        }
        for (id, offset) in placed {
            if let Some(record) = self.find_mut(&id) {
                record.offset = offset;
            }
        }
    }
}

pub type Db = Arc<RwLock<HashMap<String, DiagramRecord>>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    token: Option<Arc<str>>,
}

/// Router that accepts any non-empty access token.
pub fn app() -> Router {
    app_with_token(None)
}

/// Router that only accepts `token` when given.
pub fn app_with_token(token: Option<String>) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(HashMap::new())),
        token: token.map(Arc::from),
    };
    Router::new()
        .route("/api/1/diagrams", post(create_diagram))
        .route(
            "/api/1/diagrams/{diagram}/nodes",
            get(list_nodes).post(create_node).put(arrange_nodes),
        )
        .route(
            "/api/1/diagrams/{diagram}/nodes/{node}",
            put(update_node).delete(delete_node),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_token(listener: TcpListener, token: Option<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn check_text(text: &str) -> Result<(), ServiceError> {
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ServiceError::BadRequest(format!(
            "text must be at most {MAX_TEXT_CHARS} characters"
        )));
    }
    Ok(())
}

fn diagram_not_found() -> ServiceError {
    ServiceError::NotFound("diagram not found".to_string())
}

fn node_not_found() -> ServiceError {
    ServiceError::NotFound("node not found".to_string())
}

async fn require_token(
    State(state): State<AppState>,
    Query(auth): Query<AuthQuery>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let Some(token) = auth.access_token.filter(|t| !t.is_empty()) else {
        return Err(ServiceError::Unauthorized("missing access_token".to_string()));
    };
    if let Some(expected) = &state.token {
        if token.as_str() != &**expected {
            return Err(ServiceError::Unauthorized("invalid access token".to_string()));
        }
    }
    Ok(next.run(request).await)
}

async fn create_diagram(
    State(state): State<AppState>,
    Json(input): Json<CreateDiagram>,
) -> Result<(StatusCode, Json<Diagram>), ServiceError> {
    check_text(&input.title)?;
    let diagram = Diagram {
        id: new_id(),
        title: input.title,
    };
    let root = NodeRecord {
        id: new_id(),
        text: diagram.title.clone(),
        offset: Offset::default(),
        parent: None,
    };
    state.db.write().await.insert(
        diagram.id.clone(),
        DiagramRecord {
            title: diagram.title.clone(),
            nodes: vec![root],
        },
    );
    tracing::info!(diagram = %diagram.id, "created diagram");
    Ok((StatusCode::CREATED, Json(diagram)))
}

async fn list_nodes(
    State(state): State<AppState>,
    Path(diagram_id): Path<String>,
) -> Result<Json<Vec<Node>>, ServiceError> {
    let db = state.db.read().await;
    let diagram = db.get(&diagram_id).ok_or_else(diagram_not_found)?;
    Ok(Json(diagram.tree()))
}

async fn arrange_nodes(
    State(state): State<AppState>,
    Path(diagram_id): Path<String>,
    Query(query): Query<ActionQuery>,
) -> Result<Json<Vec<Node>>, ServiceError> {
    if query.action.as_deref() != Some("arrange") {
        return Err(ServiceError::BadRequest(
            "unsupported action, expected action=arrange".to_string(),
        ));
    }
    let mut db = state.db.write().await;
    let diagram = db.get_mut(&diagram_id).ok_or_else(diagram_not_found)?;
    diagram.arrange();
    tracing::debug!(diagram = %diagram_id, title = %diagram.title, "arranged diagram");
    Ok(Json(diagram.tree()))
}

async fn create_node(
    State(state): State<AppState>,
    Path(diagram_id): Path<String>,
    Json(input): Json<CreateNode>,
) -> Result<(StatusCode, Json<Node>), ServiceError> {
    check_text(&input.text)?;
    let mut db = state.db.write().await;
    let diagram = db.get_mut(&diagram_id).ok_or_else(diagram_not_found)?;
    if diagram.find(&input.parent).is_none() {
        return Err(ServiceError::NotFound("parent node not found".to_string()));
    }
    let record = NodeRecord {
        id: new_id(),
        text: input.text,
        offset: input.offset,
        parent: Some(input.parent),
    };
    let node = record.to_node();
    diagram.nodes.push(record);
    Ok((StatusCode::CREATED, Json(node)))
}

async fn update_node(
    State(state): State<AppState>,
    Path((diagram_id, node_id)): Path<(String, String)>,
    Json(input): Json<UpdateNode>,
) -> Result<Json<Node>, ServiceError> {
    let mut db = state.db.write().await;
    let diagram = db.get_mut(&diagram_id).ok_or_else(diagram_not_found)?;
    let current = diagram.find(&node_id).ok_or_else(node_not_found)?;

    if let Some(text) = &input.text {
        check_text(text)?;
    }
    if let Some(parent) = &input.parent {
        if current.parent.is_none() {
            return Err(ServiceError::BadRequest("the root node cannot be re-parented".to_string()));
        }
        if diagram.find(parent).is_none() {
            return Err(ServiceError::NotFound("parent node not found".to_string()));
        }
        if diagram.subtree_ids(&node_id).contains(parent) {
            return Err(ServiceError::BadRequest(
                "a node cannot be moved below itself".to_string(),
            ));
        }
    }

    let record = diagram.find_mut(&node_id).ok_or_else(node_not_found)?;
    if let Some(parent) = input.parent {
        record.parent = Some(parent);
    }
    if let Some(offset) = input.offset {
        record.offset = offset;
    }
    if let Some(text) = input.text {
        record.text = text;
    }
    Ok(Json(record.to_node()))
}

async fn delete_node(
    State(state): State<AppState>,
    Path((diagram_id, node_id)): Path<(String, String)>,
) -> Result<StatusCode, ServiceError> {
    let mut db = state.db.write().await;
    let diagram = db.get_mut(&diagram_id).ok_or_else(diagram_not_found)?;
    let target = diagram.find(&node_id).ok_or_else(node_not_found)?;
    if target.parent.is_none() {
        return Err(ServiceError::BadRequest("the root node cannot be removed".to_string()));
    }
    let doomed = diagram.subtree_ids(&node_id);
    diagram.nodes.retain(|n| !doomed.contains(&n.id));
    tracing::debug!(diagram = %diagram_id, removed = doomed.len(), "removed node subtree");
    Ok(StatusCode::NO_CONTENT)
}
