//! Client library for the Pixelfed HTTP API.
//!
//! # Overview
//! `PixelfedClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network (host-does-IO pattern). `Pixelfed`
//! pairs it with a `Transport` and exposes one method per endpoint.
//!
//! # Design
//! - Configuration (base URL, header set) is fixed at construction; clients
//!   are plain values with no shared or global state.
//! - Dynamic path segments and query values are percent-encoded.
//! - Responses decode into typed structs; `parse_value` and `execute_raw`
//!   remain for callers who want the body or response untouched.
//! - The client never retries, caches or branches on status codes; errors go
//!   straight to the caller.
//!
//! ```no_run
//! use pixelfed_core::Pixelfed;
//!
//! let api = Pixelfed::new("pixelfed.social", None);
//! let info = api.nodeinfo()?;
//! assert_eq!(info.metadata.node_name.as_deref(), Some("pixelfed"));
//! # Ok::<(), pixelfed_core::ApiError>(())
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod http;
pub mod multipart;
pub mod status;
pub mod transport;
pub mod types;

pub use api::Pixelfed;
pub use client::{normalize_domain, PixelfedClient};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use multipart::media_form;
pub use status::{StatusCreate, StatusCreateBody};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Account, Instance, InstanceStats, MediaAttachment, NodeInfo, NodeMetadata, NodeSoftware,
    NodeUsage, Notification, Relationship, ServerError, Status, Visibility,
};
