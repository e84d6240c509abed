//! Blocking client for the Coggle mind-map web API.
//!
//! # Overview
//! Three handles mirror the service's resources:
//! - `Api`: one user's authenticated connection (`create_diagram`, raw
//!   `get`/`post`/`put`/`delete`).
//! - `Diagram`: a remote diagram (`get_nodes`, `arrange`, `web_url`).
//! - `Node`: one element of a diagram's tree (`add_child`, `update`,
//!   `set_text`, `move_to`, `remove`).
//!
//! Every operation issues exactly one HTTP request and returns once the
//! response has been interpreted.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`/`HttpResponse`)
//!   passed through a `Transport`; `UreqTransport` is the default.
//! - Server JSON is mapped through typed resources in `types`, so a missing
//!   `_id`, `text` or `offset` is a deserialization error, not a panic.
//! - Node trees are owned `Vec<Node>` hierarchies borrowing their `Diagram`;
//!   children refer to their parent only by id.
//!
//! ```no_run
//! use mindmap_core::{Api, ApiOptions, Offset};
//!
//! # fn main() -> Result<(), mindmap_core::ApiError> {
//! let api = Api::new(ApiOptions::from_env())?;
//! let diagram = api.create_diagram("Trip")?;
//! let mut nodes = diagram.get_nodes()?;
//! let root = &mut nodes[0];
//! root.add_child("Packing", Offset::new(150.0, -40.0))?;
//! println!("{}", diagram.web_url());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod diagram;
pub mod error;
pub mod http;
pub mod node;
pub mod types;
pub mod validate;

#[cfg(test)]
mod testing;

pub use client::Api;
pub use config::ApiOptions;
pub use diagram::Diagram;
pub use error::{ApiError, ApiResult, Violation};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
#[cfg(feature = "ureq")]
pub use http::UreqTransport;
pub use node::{find_node, Node};
pub use types::{NodeUpdate, Offset};
