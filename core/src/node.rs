//! Nodes of a diagram's tree and the operations that mutate them.
//!
//! # Design
//! A `Node` borrows the `Diagram` it belongs to and owns its children, so a
//! tree returned by `Diagram::get_nodes` is a plain owned hierarchy.
//! Children point back to their parent only through `parent_id`, a lookup
//! key, never a structural reference.
//!
//! A node is a snapshot. Its fields are refreshed from the server only by its
//! own successful mutations; nothing polls for changes made elsewhere.

use serde_json::Value;
use tracing::debug;

use crate::diagram::Diagram;
use crate::error::{ApiError, ApiResult, Violation};
use crate::types::{NewNode, NodeResource, NodeUpdate, Offset};
use crate::validate;

pub const NODE_ENDPOINT: &str = "/api/1/diagrams/:diagram/nodes/:node";

#[derive(Debug, Clone)]
pub struct Node<'d> {
    id: String,
    text: String,
    offset: Offset,
    parent_id: Option<String>,
    children: Vec<Node<'d>>,
    diagram: &'d Diagram,
}

impl<'d> Node<'d> {
    /// Materialize a resource and everything embedded under it. Embedded
    /// children always take this node's id as their `parent_id`.
    pub(crate) fn from_resource(diagram: &'d Diagram, resource: NodeResource) -> Self {
        let NodeResource {
            id,
            text,
            offset,
            parent,
            children,
        } = resource;

        let children = children
            .into_iter()
            .map(|child| {
                let mut node = Node::from_resource(diagram, child);
                node.parent_id = Some(id.clone());
                node
            })
            .collect();

        Self {
            id,
            text,
            offset,
            parent_id: parent,
            children,
            diagram,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// `None` for a root node.
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn children(&self) -> &[Node<'d>] {
        &self.children
    }

    pub fn diagram(&self) -> &'d Diagram {
        self.diagram
    }

    /// Substitute `:diagram` and `:node` in `template`.
    pub fn replace_ids(&self, template: &str) -> String {
        self.diagram.replace_id(template).replace(":node", &self.id)
    }

    /// This node and every node below it, depth first, parents before
    /// children.
    pub fn descendants(&self) -> Descendants<'_, 'd> {
        Descendants { stack: vec![self] }
    }

    /// Look up `id` in this subtree, including this node itself.
    pub fn find(&self, id: &str) -> Option<&Node<'d>> {
        self.descendants().find(|node| node.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node<'d>> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Create a new node under this one and append it to `children`.
    ///
    /// The text and offset are not checked client-side; the service's
    /// rejection is returned unchanged.
    pub fn add_child(&mut self, text: &str, offset: Offset) -> ApiResult<&mut Node<'d>> {
        let body = NewNode {
            parent: self.id.clone(),
            offset,
            text: text.to_string(),
        };
        let resource: NodeResource =
            self.diagram
                .api()
                .post(&self.diagram.nodes_endpoint(), None, &body)?;

        let mut child = Node::from_resource(self.diagram, resource);
        child.parent_id = Some(self.id.clone());
        debug!(node = %child.id, parent = %self.id, "added child node");

        let index = self.children.len();
        self.children.push(child);
        Ok(&mut self.children[index])
    }

    /// Apply a partial update and refresh `parent_id`, `text` and `offset`
    /// from the server's reply.
    ///
    /// All fields are checked before anything is sent; every violation is
    /// reported together in one `ApiError::Validation`.
    pub fn update(&mut self, update: NodeUpdate) -> ApiResult<&mut Self> {
        validate::check_update(&update)?;
        let resource: NodeResource =
            self.diagram
                .api()
                .put(&self.replace_ids(NODE_ENDPOINT), None, &update)?;
        self.refresh(resource);
        Ok(self)
    }

    /// `update` for an untyped JSON object such as
    /// `{"offset": {"x": 10, "y": 0}}`. Shape errors are validation errors.
    pub fn update_json(&mut self, properties: &Value) -> ApiResult<&mut Self> {
        let update = validate::parse_update(properties)?;
        self.update(update)
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> ApiResult<&mut Self> {
        self.update(NodeUpdate::new().text(text))
    }

    pub fn move_to(&mut self, offset: Offset) -> ApiResult<&mut Self> {
        self.update(NodeUpdate::new().offset(offset))
    }

    fn refresh(&mut self, resource: NodeResource) {
        self.text = resource.text;
        self.offset = resource.offset;
        if resource.parent.is_some() {
            self.parent_id = resource.parent;
        }
    }

    /// Delete this node on the server. The service removes every descendant
    /// too; this value and its `children` are left as they were and should
    /// be discarded (see `remove_child` for the variant that detaches).
    pub fn remove(&self) -> ApiResult<()> {
        self.diagram.api().delete(&self.replace_ids(NODE_ENDPOINT), None)?;
        debug!(node = %self.id, "removed node");
        Ok(())
    }

    /// Delete the descendant `id` on the server and drop its subtree from
    /// this tree, returning the detached copy.
    pub fn remove_child(&mut self, id: &str) -> ApiResult<Node<'d>> {
        let not_below = || {
            ApiError::Validation(vec![Violation::new(
                "id",
                format!("{id} is not below node {}", self.id),
            )])
        };
        let target = self
            .children
            .iter()
            .flat_map(|child| child.descendants())
            .find(|node| node.id == id)
            .ok_or_else(not_below)?;
        target.remove()?;
        let error = not_below();
        self.detach(id).ok_or(error)
    }

    fn detach(&mut self, id: &str) -> Option<Node<'d>> {
        if let Some(index) = self.children.iter().position(|child| child.id == id) {
            return Some(self.children.remove(index));
        }
        self.children.iter_mut().find_map(|child| child.detach(id))
    }
}

/// Pre-order walk over a subtree. See `Node::descendants`.
pub struct Descendants<'a, 'd> {
    stack: Vec<&'a Node<'d>>,
}

impl<'a, 'd> Iterator for Descendants<'a, 'd> {
    type Item = &'a Node<'d>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Look up `id` across a forest such as the result of `Diagram::get_nodes`.
pub fn find_node<'a, 'd>(nodes: &'a [Node<'d>], id: &str) -> Option<&'a Node<'d>> {
    nodes.iter().find_map(|node| node.find(id))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::Api;
    use crate::config::ApiOptions;
    use crate::http::HttpMethod;
    use crate::testing::RecordingTransport;

    const ROOT: &str = r#"[{"_id":"root","text":"Plans","offset":{"x":0,"y":0},
        "children":[{"_id":"a","text":"A","offset":{"x":100,"y":50},"parent":"root",
            "children":[{"_id":"a1","text":"A1","offset":{"x":80,"y":0},"parent":"a"}]}]}]"#;

    fn diagram(transport: &RecordingTransport) -> Diagram {
        Api::with_transport(
            ApiOptions::new().token("t").base_url("http://localhost:3000"),
            transport.clone(),
        )
        .unwrap()
        .diagram("d1", "Plans")
    }

    fn body(request: &crate::http::HttpRequest) -> Value {
        serde_json::from_str(request.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn replace_ids_fills_both_placeholders() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        let diagram = diagram(&transport);
        let nodes = diagram.get_nodes().unwrap();
        assert_eq!(
            nodes[0].replace_ids(NODE_ENDPOINT),
            "/api/1/diagrams/d1/nodes/root"
        );
    }

    #[test]
    fn add_child_appends_and_links_parent() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        transport.respond(
            201,
            r#"{"_id":"c","text":"C","offset":{"x":100,"y":50},"parent":"root"}"#,
        );
        let diagram = diagram(&transport);
        let mut nodes = diagram.get_nodes().unwrap();
        let root = &mut nodes[0];

        let child = root.add_child("C", Offset::new(100.0, 50.0)).unwrap();
        assert_eq!(child.id(), "c");
        assert_eq!(child.parent_id(), Some("root"));
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.children()[1].id(), "c");

        let sent = transport.requests();
        assert_eq!(sent[1].method, HttpMethod::Post);
        assert!(sent[1].url.starts_with("http://localhost:3000/api/1/diagrams/d1/nodes?"));
        assert_eq!(
            body(&sent[1]),
            json!({"parent": "root", "offset": {"x": 100.0, "y": 50.0}, "text": "C"})
        );
    }

    #[test]
    fn add_child_propagates_error_unwrapped() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        transport.respond(400, r#"{"description":"text too long"}"#);
        let diagram = diagram(&transport);
        let mut nodes = diagram.get_nodes().unwrap();

        let err = nodes[0].add_child("C", Offset::default()).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 400, .. }));
        assert_eq!(nodes[0].children().len(), 1);
    }

    #[test]
    fn set_text_sends_only_text_and_refreshes_in_place() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        transport.respond(
            200,
            r#"{"_id":"a","text":"renamed","offset":{"x":100,"y":50},"parent":"root"}"#,
        );
        let diagram = diagram(&transport);
        let mut nodes = diagram.get_nodes().unwrap();
        let a = nodes[0].find_mut("a").unwrap();

        let returned_id = a.set_text("renamed").unwrap().id().to_string();
        assert_eq!(returned_id, "a");
        assert_eq!(a.text(), "renamed");
        assert_eq!(a.parent_id(), Some("root"));
        assert_eq!(a.children().len(), 1);

        let sent = transport.requests();
        assert_eq!(sent[1].method, HttpMethod::Put);
        assert!(sent[1].url.starts_with("http://localhost:3000/api/1/diagrams/d1/nodes/a?"));
        assert_eq!(body(&sent[1]), json!({"text": "renamed"}));
    }

    #[test]
    fn move_to_refreshes_offset() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        transport.respond(
            200,
            r#"{"_id":"a","text":"A","offset":{"x":-100,"y":-20},"parent":"root"}"#,
        );
        let diagram = diagram(&transport);
        let mut nodes = diagram.get_nodes().unwrap();
        let a = nodes[0].find_mut("a").unwrap();

        a.move_to(Offset::new(-100.0, -20.0)).unwrap();
        assert_eq!(a.offset(), Offset::new(-100.0, -20.0));
        assert_eq!(
            body(&transport.requests()[1]),
            json!({"offset": {"x": -100.0, "y": -20.0}})
        );
    }

    #[test]
    fn invalid_update_sends_nothing() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        let diagram = diagram(&transport);
        let mut nodes = diagram.get_nodes().unwrap();

        let err = nodes[0]
            .update_json(&json!({"offset": {"x": "bad", "y": 1}}))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.violations().unwrap()[0].field, "offset.x");

        let err = nodes[0]
            .update(NodeUpdate::new().offset(Offset::new(f64::NAN, 0.0)))
            .unwrap_err();
        assert!(!err.is_request_error());

        assert_eq!(transport.requests().len(), 1);
        assert_eq!(nodes[0].offset(), Offset::new(0.0, 0.0));
    }

    #[test]
    fn remove_deletes_node_endpoint() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        transport.respond(204, "");
        let diagram = diagram(&transport);
        let nodes = diagram.get_nodes().unwrap();

        nodes[0].find("a").unwrap().remove().unwrap();
        let sent = transport.requests();
        assert_eq!(sent[1].method, HttpMethod::Delete);
        assert!(sent[1].url.starts_with("http://localhost:3000/api/1/diagrams/d1/nodes/a?"));
        assert!(sent[1].body.is_none());
    }

    #[test]
    fn remove_child_detaches_subtree() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        transport.respond(204, "");
        let diagram = diagram(&transport);
        let mut nodes = diagram.get_nodes().unwrap();

        let removed = nodes[0].remove_child("a").unwrap();
        assert_eq!(removed.id(), "a");
        assert!(nodes[0].children().is_empty());
        assert!(find_node(&nodes, "a1").is_none());
    }

    #[test]
    fn remove_child_rejects_unknown_id_without_request() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        let diagram = diagram(&transport);
        let mut nodes = diagram.get_nodes().unwrap();

        let err = nodes[0].remove_child("root").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn remove_failure_keeps_local_tree() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        transport.respond(404, r#"{"description":"node not found"}"#);
        let diagram = diagram(&transport);
        let mut nodes = diagram.get_nodes().unwrap();

        let err = nodes[0].remove_child("a1").unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(find_node(&nodes, "a1").is_some());
    }

    #[test]
    fn descendants_are_pre_order() {
        let transport = RecordingTransport::new();
        transport.respond(200, ROOT);
        let diagram = diagram(&transport);
        let nodes = diagram.get_nodes().unwrap();
        let order: Vec<&str> = nodes[0].descendants().map(|n| n.id()).collect();
        assert_eq!(order, vec!["root", "a", "a1"]);
    }
}
