//! Status creation input and its validation.
//!
//! `StatusCreate` is what callers fill in; `StatusCreateBody` is what goes on
//! the wire. The only way from one to the other is `validate`, so an invalid
//! request never reaches `build_status_create`'s output.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::types::Visibility;

/// Caller input for `POST api/v1/statuses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCreate {
    pub media_ids: Vec<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
}

fn default_scope() -> String {
    Visibility::Public.as_str().to_string()
}

impl StatusCreate {
    pub fn new<I, S>(media_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            media_ids: media_ids.into_iter().map(|id| id.to_string()).collect(),
            caption: None,
            sensitive: false,
            scope: default_scope(),
            in_reply_to_id: None,
        }
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn in_reply_to(mut self, id: impl Into<String>) -> Self {
        self.in_reply_to_id = Some(id.into());
        self
    }

    /// Check the media ids and scope and produce the wire body.
    ///
    /// Rejects an empty id list, any id that is not a non-negative integer,
    /// and any scope other than `private`, `unlisted` or `public`.
    pub fn validate(&self) -> Result<StatusCreateBody, ApiError> {
        let media_ids = parse_media_ids(&self.media_ids)
            .ok_or_else(|| ApiError::InvalidMediaIds(self.media_ids.clone()))?;
        let visibility = Visibility::parse_scope(&self.scope)
            .ok_or_else(|| ApiError::InvalidScope(self.scope.clone()))?;

        Ok(StatusCreateBody {
            media_ids,
            status: self.caption.clone(),
            in_reply_to_id: self.in_reply_to_id.clone(),
            sensitive: self.sensitive,
            visibility,
        })
    }
}

fn parse_media_ids(ids: &[String]) -> Option<Vec<u64>> {
    if ids.is_empty() {
        return None;
    }
    ids.iter().map(|id| id.trim().parse::<u64>().ok()).collect()
}

/// JSON body of `POST api/v1/statuses`. Absent caption and reply id
/// serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCreateBody {
    pub media_ids: Vec<u64>,
    pub status: Option<String>,
    pub in_reply_to_id: Option<String>,
    pub sensitive: bool,
    pub visibility: Visibility,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn body_matches_wire_shape() {
        let body = StatusCreate::new([1, 2, 3])
            .caption("hello")
            .scope("public")
            .validate()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "media_ids": [1, 2, 3],
                "status": "hello",
                "in_reply_to_id": null,
                "sensitive": false,
                "visibility": "public"
            })
        );
    }

    #[test]
    fn defaults_are_public_and_not_sensitive() {
        let input = StatusCreate::new(["5"]);
        assert_eq!(input.scope, "public");
        assert!(!input.sensitive);
        let body = input.validate().unwrap();
        assert_eq!(body.visibility, Visibility::Public);
        assert!(body.status.is_none());
    }

    #[test]
    fn bogus_scope_is_rejected() {
        let err = StatusCreate::new([1]).scope("bogus").validate().unwrap_err();
        assert!(matches!(err, ApiError::InvalidScope(ref s) if s == "bogus"));
    }

    #[test]
    fn direct_scope_is_rejected() {
        let err = StatusCreate::new([1]).scope("direct").validate().unwrap_err();
        assert!(matches!(err, ApiError::InvalidScope(_)));
    }

    // The historical check had its polarity inverted and accepted exactly the
    // inputs below while rejecting valid numeric lists.
    #[test]
    fn empty_media_ids_are_rejected() {
        let err = StatusCreate::new(Vec::<u64>::new()).validate().unwrap_err();
        assert!(matches!(err, ApiError::InvalidMediaIds(ref ids) if ids.is_empty()));
    }

    #[test]
    fn non_numeric_media_id_is_rejected() {
        let err = StatusCreate::new(["a", "2"]).validate().unwrap_err();
        assert!(matches!(err, ApiError::InvalidMediaIds(_)));
    }

    #[test]
    fn blank_and_negative_media_ids_are_rejected() {
        assert!(StatusCreate::new([""]).validate().is_err());
        assert!(StatusCreate::new(["-1"]).validate().is_err());
        assert!(StatusCreate::new(["1.5"]).validate().is_err());
    }

    #[test]
    fn numeric_strings_are_accepted_and_trimmed() {
        let body = StatusCreate::new([" 12 ", "0034"]).validate().unwrap();
        assert_eq!(body.media_ids, vec![12, 34]);
    }

    #[test]
    fn media_ids_are_checked_before_scope() {
        let err = StatusCreate::new(["x"]).scope("bogus").validate().unwrap_err();
        assert!(matches!(err, ApiError::InvalidMediaIds(_)));
    }

    #[test]
    fn reply_and_sensitive_are_carried() {
        let body = StatusCreate::new([9])
            .sensitive(true)
            .scope("unlisted")
            .in_reply_to("42")
            .validate()
            .unwrap();
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["sensitive"], true);
        assert_eq!(value["visibility"], "unlisted");
        assert_eq!(value["in_reply_to_id"], "42");
    }
}
