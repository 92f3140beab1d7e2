//! The public endpoint surface: one method per Pixelfed endpoint.
//!
//! Each method builds the request with `PixelfedClient`, runs it through the
//! `Transport`, and decodes the body. Nothing is cached or retried, and each
//! call issues exactly one request. All methods take `&self`, so a
//! `Pixelfed<UreqTransport>` can be shared across threads.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::client::PixelfedClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::status::StatusCreate;
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    Account, Instance, MediaAttachment, NodeInfo, Notification, Relationship, Status,
};

pub struct Pixelfed<T: Transport = UreqTransport> {
    client: PixelfedClient,
    transport: T,
}

impl Pixelfed<UreqTransport> {
    /// Client for `domain` over the default blocking transport.
    pub fn new(domain: &str, access_token: Option<&str>) -> Self {
        Self::with_transport(PixelfedClient::new(domain, access_token), UreqTransport::new())
    }
}

impl<T: Transport> Pixelfed<T> {
    pub fn with_transport(client: PixelfedClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &PixelfedClient {
        &self.client
    }

    /// Run a request and hand back the response untouched.
    pub fn execute_raw(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.transport.execute(request)
    }

    fn call<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        let response = self.transport.execute(&request)?;
        self.client.parse(response)
    }

    // --- identity ---

    /// Confirm the access token works and return its account.
    pub fn verify_credentials(&self) -> Result<Account, ApiError> {
        self.call(self.client.build_verify_credentials())
    }

    pub fn nodeinfo(&self) -> Result<NodeInfo, ApiError> {
        self.call(self.client.build_nodeinfo())
    }

    pub fn instance(&self) -> Result<Instance, ApiError> {
        self.call(self.client.build_instance())
    }

    // --- accounts ---

    pub fn account(&self, id: &str) -> Result<Account, ApiError> {
        self.call(self.client.build_account(id))
    }

    pub fn account_followers(&self, id: &str) -> Result<Vec<Account>, ApiError> {
        self.call(self.client.build_account_followers(id))
    }

    pub fn account_following(&self, id: &str) -> Result<Vec<Account>, ApiError> {
        self.call(self.client.build_account_following(id))
    }

    pub fn account_statuses(&self, id: &str) -> Result<Vec<Status>, ApiError> {
        self.call(self.client.build_account_statuses(id))
    }

    pub fn account_search(&self, query: &str) -> Result<Vec<Account>, ApiError> {
        self.call(self.client.build_account_search(query))
    }

    pub fn follow(&self, id: &str) -> Result<Relationship, ApiError> {
        self.call(self.client.build_follow(id))
    }

    pub fn unfollow(&self, id: &str) -> Result<Relationship, ApiError> {
        self.call(self.client.build_unfollow(id))
    }

    pub fn block(&self, id: &str) -> Result<Relationship, ApiError> {
        self.call(self.client.build_block(id))
    }

    pub fn unblock(&self, id: &str) -> Result<Relationship, ApiError> {
        self.call(self.client.build_unblock(id))
    }

    pub fn mute(&self, id: &str) -> Result<Relationship, ApiError> {
        self.call(self.client.build_mute(id))
    }

    pub fn unmute(&self, id: &str) -> Result<Relationship, ApiError> {
        self.call(self.client.build_unmute(id))
    }

    // --- the authenticated account's own lists ---

    pub fn blocks(&self) -> Result<Vec<Account>, ApiError> {
        self.call(self.client.build_blocks())
    }

    pub fn mutes(&self) -> Result<Vec<Account>, ApiError> {
        self.call(self.client.build_mutes())
    }

    pub fn follow_requests(&self) -> Result<Vec<Account>, ApiError> {
        self.call(self.client.build_follow_requests())
    }

    /// Statuses the authenticated account has liked.
    pub fn favourites(&self) -> Result<Vec<Status>, ApiError> {
        self.call(self.client.build_favourites())
    }

    pub fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.call(self.client.build_notifications())
    }

    // --- timelines ---

    pub fn home_timeline(&self) -> Result<Vec<Status>, ApiError> {
        self.call(self.client.build_home_timeline())
    }

    pub fn public_timeline(&self) -> Result<Vec<Status>, ApiError> {
        self.call(self.client.build_public_timeline())
    }

    // --- statuses ---

    pub fn status(&self, id: &str) -> Result<Status, ApiError> {
        self.call(self.client.build_status(id))
    }

    pub fn status_reblogged_by(&self, id: &str) -> Result<Vec<Account>, ApiError> {
        self.call(self.client.build_status_reblogged_by(id))
    }

    pub fn status_favourited_by(&self, id: &str) -> Result<Vec<Account>, ApiError> {
        self.call(self.client.build_status_favourited_by(id))
    }

    pub fn favourite(&self, id: &str) -> Result<Status, ApiError> {
        self.call(self.client.build_favourite(id))
    }

    pub fn unfavourite(&self, id: &str) -> Result<Status, ApiError> {
        self.call(self.client.build_unfavourite(id))
    }

    /// Publish a status. Validation failures return before any request is
    /// sent.
    pub fn status_create(&self, input: &StatusCreate) -> Result<Status, ApiError> {
        let request = self.client.build_status_create(input).inspect_err(|e| {
            if e.is_validation() {
                tracing::warn!(error = %e, "status rejected before dispatch");
            }
        })?;
        self.call(request)
    }

    // --- media ---

    pub fn media_upload(&self, content: &[u8]) -> Result<MediaAttachment, ApiError> {
        self.call(self.client.build_media_upload(content))
    }

    /// Read `path` and upload its bytes.
    pub fn media_upload_file(&self, path: impl AsRef<Path>) -> Result<MediaAttachment, ApiError> {
        let content = std::fs::read(path.as_ref())?;
        self.media_upload(&content)
    }
}
