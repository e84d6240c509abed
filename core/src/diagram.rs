//! A single remote diagram and its node collection.

use serde_json::Map;

use crate::client::Api;
use crate::error::ApiResult;
use crate::node::Node;
use crate::types::{DiagramResource, NodeResource};

pub const NODES_ENDPOINT: &str = "/api/1/diagrams/:diagram/nodes";
pub const WEB_URL_TEMPLATE: &str = "/diagram/:diagram";

/// Handle to one diagram. `title` is whatever the service last reported
/// and is not refreshed by node operations.
#[derive(Debug, Clone)]
pub struct Diagram {
    id: String,
    title: String,
    api: Api,
}

impl Diagram {
    pub(crate) fn from_resource(api: Api, resource: DiagramResource) -> Self {
        Self {
            id: resource.id,
            title: resource.title,
            api,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    /// Browser URL for this diagram.
    pub fn web_url(&self) -> String {
        self.replace_id(&format!("{}{WEB_URL_TEMPLATE}", self.api.base_url()))
    }

    /// Substitute `:diagram` in `template` with this diagram's id.
    pub fn replace_id(&self, template: &str) -> String {
        template.replace(":diagram", &self.id)
    }

    pub(crate) fn nodes_endpoint(&self) -> String {
        self.replace_id(NODES_ENDPOINT)
    }

    fn materialize(&self, resources: Vec<NodeResource>) -> Vec<Node<'_>> {
        resources
            .into_iter()
            .map(|resource| Node::from_resource(self, resource))
            .collect()
    }

    /// Fetch the diagram's node tree. Usually a single root whose
    /// descendants hang off `children`.
    pub fn get_nodes(&self) -> ApiResult<Vec<Node<'_>>> {
        let resources: Vec<NodeResource> = self
            .api
            .get(&self.nodes_endpoint(), None)
            .map_err(|e| e.context("failed to get diagram nodes"))?;
        Ok(self.materialize(resources))
    }

    /// Ask the service to re-lay-out every node so branches do not overlap,
    /// and return the resulting tree. Layouts may differ between calls.
    pub fn arrange(&self) -> ApiResult<Vec<Node<'_>>> {
        let resources: Vec<NodeResource> = self
            .api
            .put(&self.nodes_endpoint(), Some("action=arrange"), &Map::new())
            .map_err(|e| e.context("failed to arrange diagram"))?;
        Ok(self.materialize(resources))
    }
}
