//! Stateless HTTP request builder and response parser for the Pixelfed API.
//!
//! # Design
//! `PixelfedClient` holds the normalized base URL and the header set, both
//! fixed at construction. Every endpoint has a `build_*` method producing an
//! `HttpRequest`; every response goes through `parse`. The caller (or the
//! `Pixelfed` wrapper with a `Transport`) executes the round-trip in between,
//! so this layer stays deterministic and free of I/O.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shiguredo_http11::multipart::MultipartBuilder;
use urlencoding::encode;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::media_form;
use crate::status::StatusCreate;
use crate::types::ServerError;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const AUTHORIZATION: &str = "Authorization";
const JSON: &str = "application/json";

/// Normalize an instance domain into a base URL.
///
/// Lower-cases the input, prepends `https://` unless an `http://` or
/// `https://` scheme is present, and collapses any trailing slashes into one.
/// Applying it twice gives the same result as applying it once.
pub fn normalize_domain(domain: &str) -> String {
    let lower = domain.to_lowercase();
    let (scheme, host) = if let Some(rest) = lower.strip_prefix("http://") {
        ("http://", rest)
    } else if let Some(rest) = lower.strip_prefix("https://") {
        ("https://", rest)
    } else {
        ("https://", lower.as_str())
    };
    format!("{scheme}{}/", host.trim_end_matches('/'))
}

/// Synchronous, stateless client for the Pixelfed API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct PixelfedClient {
    base_url: String,
    headers: Vec<(String, String)>,
}

impl PixelfedClient {
    /// An empty token is treated the same as no token.
    pub fn new(domain: &str, access_token: Option<&str>) -> Self {
        let mut headers = vec![(CONTENT_TYPE.to_string(), JSON.to_string())];
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            headers.push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
        }
        Self {
            base_url: normalize_domain(domain),
            headers,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn has_token(&self) -> bool {
        self.headers.iter().any(|(k, _)| k == AUTHORIZATION)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    fn get(&self, endpoint: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url(endpoint),
            headers: self.headers.clone(),
            body: None,
        }
    }

    fn post(&self, endpoint: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            url: self.url(endpoint),
            headers: self.headers.clone(),
            body: None,
        }
    }

    fn post_json<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(body).map_err(ApiError::Serialization)?;
        Ok(HttpRequest {
            body: Some(body),
            ..self.post(endpoint)
        })
    }

    // The JSON content type is replaced, not supplemented: the server parses
    // the body by the declared boundary.
    fn post_multipart(&self, endpoint: &str, form: &MultipartBuilder) -> HttpRequest {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case(CONTENT_TYPE))
            .cloned()
            .collect();
        headers.push((CONTENT_TYPE.to_string(), form.content_type()));
        HttpRequest {
            method: HttpMethod::Post,
            url: self.url(endpoint),
            headers,
            body: Some(form.build()),
        }
    }

    // --- identity ---

    pub fn build_verify_credentials(&self) -> HttpRequest {
        self.get("api/v1/accounts/verify_credentials")
    }

    pub fn build_nodeinfo(&self) -> HttpRequest {
        self.get("api/nodeinfo/2.0.json")
    }

    pub fn build_instance(&self) -> HttpRequest {
        self.get("api/v1/instance")
    }

    // --- accounts ---

    pub fn build_account(&self, id: &str) -> HttpRequest {
        self.get(&format!("api/v1/accounts/{}", encode(id)))
    }

    pub fn build_account_followers(&self, id: &str) -> HttpRequest {
        self.get(&format!("api/v1/accounts/{}/followers", encode(id)))
    }

    pub fn build_account_following(&self, id: &str) -> HttpRequest {
        self.get(&format!("api/v1/accounts/{}/following", encode(id)))
    }

    pub fn build_account_statuses(&self, id: &str) -> HttpRequest {
        self.get(&format!("api/v1/accounts/{}/statuses", encode(id)))
    }

    pub fn build_account_search(&self, query: &str) -> HttpRequest {
        self.get(&format!("api/v1/accounts/search?q={}", encode(query)))
    }

    pub fn build_follow(&self, id: &str) -> HttpRequest {
        self.post(&format!("api/v1/accounts/{}/follow", encode(id)))
    }

    pub fn build_unfollow(&self, id: &str) -> HttpRequest {
        self.post(&format!("api/v1/accounts/{}/unfollow", encode(id)))
    }

    pub fn build_block(&self, id: &str) -> HttpRequest {
        self.post(&format!("api/v1/accounts/{}/block", encode(id)))
    }

    pub fn build_unblock(&self, id: &str) -> HttpRequest {
        self.post(&format!("api/v1/accounts/{}/unblock", encode(id)))
    }

    pub fn build_mute(&self, id: &str) -> HttpRequest {
        self.post(&format!("api/v1/accounts/{}/mute", encode(id)))
    }

    pub fn build_unmute(&self, id: &str) -> HttpRequest {
        self.post(&format!("api/v1/accounts/{}/unmute", encode(id)))
    }

    // --- the authenticated account's own lists ---

    pub fn build_blocks(&self) -> HttpRequest {
        self.get("api/v1/blocks")
    }

    pub fn build_mutes(&self) -> HttpRequest {
        self.get("api/v1/mutes")
    }

    pub fn build_follow_requests(&self) -> HttpRequest {
        self.get("api/v1/follow_requests")
    }

    pub fn build_favourites(&self) -> HttpRequest {
        self.get("api/v1/favourites")
    }

    pub fn build_notifications(&self) -> HttpRequest {
        self.get("api/v1/notifications")
    }

    // --- timelines ---

    pub fn build_home_timeline(&self) -> HttpRequest {
        self.get("api/v1/timelines/home")
    }

    pub fn build_public_timeline(&self) -> HttpRequest {
        self.get("api/v1/timelines/public")
    }

    // --- statuses ---

    pub fn build_status(&self, id: &str) -> HttpRequest {
        self.get(&format!("api/v1/statuses/{}", encode(id)))
    }

    pub fn build_status_reblogged_by(&self, id: &str) -> HttpRequest {
        self.get(&format!("api/v1/statuses/{}/reblogged_by", encode(id)))
    }

    pub fn build_status_favourited_by(&self, id: &str) -> HttpRequest {
        self.get(&format!("api/v1/statuses/{}/favourited_by", encode(id)))
    }

    pub fn build_favourite(&self, id: &str) -> HttpRequest {
        self.post(&format!("api/v1/statuses/{}/favourite", encode(id)))
    }

    pub fn build_unfavourite(&self, id: &str) -> HttpRequest {
        self.post(&format!("api/v1/statuses/{}/unfavourite", encode(id)))
    }

    /// Validates `input` first; an invalid input yields no request at all.
    pub fn build_status_create(&self, input: &StatusCreate) -> Result<HttpRequest, ApiError> {
        let body = input.validate()?;
        self.post_json("api/v1/statuses", &body)
    }

    // --- media ---

    pub fn build_media_upload(&self, content: &[u8]) -> HttpRequest {
        self.post_multipart("api/v1/media", &media_form(content))
    }

    // --- responses ---

    /// Decode a response body into `T`.
    ///
    /// The status code is not consulted when the body decodes. Otherwise an
    /// embedded API error object becomes `ApiError::Server`, a non-2xx
    /// response becomes `ApiError::Http`, and a 2xx response becomes
    /// `ApiError::Deserialization`.
    pub fn parse<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        serde_json::from_slice(&response.body).map_err(|e| classify_failure(response, e))
    }

    /// Decode a response body verbatim, without imposing a shape.
    pub fn parse_value(&self, response: HttpResponse) -> Result<serde_json::Value, ApiError> {
        self.parse(response)
    }
}

fn classify_failure(response: HttpResponse, err: serde_json::Error) -> ApiError {
    if let Ok(server) = serde_json::from_slice::<ServerError>(&response.body) {
        return ApiError::Server {
            status: response.status,
            error: server.error,
            description: server.error_description,
        };
    }
    if !response.is_success() {
        return ApiError::Http {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        };
    }
    ApiError::Deserialization(err)
}
