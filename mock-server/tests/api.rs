use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Account, ErrorBody, MediaAttachment, Relationship, Status, DEFAULT_TOKEN};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn authed(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {DEFAULT_TOKEN}"))
        .body(String::new())
        .unwrap()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {DEFAULT_TOKEN}"))
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn multipart_request(boundary: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/media")
        .header(http::header::AUTHORIZATION, format!("Bearer {DEFAULT_TOKEN}"))
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(body.to_string())
        .unwrap()
}

// --- identity ---

#[tokio::test]
async fn nodeinfo_names_pixelfed() {
    let resp = app().oneshot(get("/api/nodeinfo/2.0.json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let info: serde_json::Value = body_json(resp).await;
    assert_eq!(info["metadata"]["nodeName"], "pixelfed");
    assert_eq!(info["software"]["name"], "pixelfed");
}

#[tokio::test]
async fn verify_credentials_requires_token() {
    let resp = app()
        .oneshot(get("/api/v1/accounts/verify_credentials"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.error, "Unauthenticated.");
}

#[tokio::test]
async fn verify_credentials_returns_self() {
    let resp = app()
        .oneshot(authed("GET", "/api/v1/accounts/verify_credentials"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Account = body_json(resp).await;
    assert_eq!(me.id, "1");
    assert_eq!(me.username, "admin");
}

// --- accounts ---

#[tokio::test]
async fn unknown_account_is_404_with_error_body() {
    let resp = app().oneshot(get("/api/v1/accounts/999")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.error, "Record not found");
}

#[tokio::test]
async fn search_is_case_insensitive() {
    let resp = app()
        .oneshot(get("/api/v1/accounts/search?q=ALI"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let found: Vec<Account> = body_json(resp).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "alice");
}

#[tokio::test]
async fn follow_without_token_is_rejected() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/accounts/2/follow")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_account_action_is_404() {
    let resp = app()
        .oneshot(authed("POST", "/api/v1/accounts/2/poke"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn relationship_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("POST", "/api/v1/accounts/2/follow"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let rel: Relationship = body_json(resp).await;
    assert!(rel.following);
    assert!(rel.followed_by);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("POST", "/api/v1/accounts/2/mute"))
        .await
        .unwrap();
    let rel: Relationship = body_json(resp).await;
    assert!(rel.muting);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/api/v1/mutes"))
        .await
        .unwrap();
    let muted: Vec<Account> = body_json(resp).await;
    assert_eq!(muted.len(), 1);
    assert_eq!(muted[0].id, "2");

    // blocking severs the follow in both directions
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("POST", "/api/v1/accounts/2/block"))
        .await
        .unwrap();
    let rel: Relationship = body_json(resp).await;
    assert!(rel.blocking);
    assert!(!rel.following);
    assert!(!rel.followed_by);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("POST", "/api/v1/accounts/2/unblock"))
        .await
        .unwrap();
    let rel: Relationship = body_json(resp).await;
    assert!(!rel.blocking);
}

// --- statuses ---

#[tokio::test]
async fn public_timeline_excludes_unlisted() {
    let resp = app().oneshot(get("/api/v1/timelines/public")).await.unwrap();
    let statuses: Vec<Status> = body_json(resp).await;
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].visibility, "public");
}

#[tokio::test]
async fn non_numeric_status_id_is_404() {
    let resp = app().oneshot(get("/api/v1/statuses/abc")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_status_rejects_unknown_media() {
    let resp = app()
        .oneshot(json_request(
            "/api/v1/statuses",
            r#"{"media_ids":[5],"status":"hi","in_reply_to_id":null,"sensitive":false,"visibility":"public"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.error, "Invalid media_ids");
}

#[tokio::test]
async fn create_status_with_seeded_media() {
    let resp = app()
        .oneshot(json_request(
            "/api/v1/statuses",
            r#"{"media_ids":[100],"status":"hi","in_reply_to_id":null,"sensitive":true,"visibility":"private"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let status: Status = body_json(resp).await;
    assert_eq!(status.content, "hi");
    assert!(status.sensitive);
    assert_eq!(status.visibility, "private");
    assert_eq!(status.account.id, "1");
    assert_eq!(status.media_attachments.len(), 1);
}

// --- media ---

#[tokio::test]
async fn upload_media_accepts_multipart() {
    let body = "--XyZ\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"tmp.jpg\"\r\n\
        Content-Type: image/jpeg\r\n\r\n\
        jpegbytes\r\n\
        --XyZ--\r\n";
    let resp = app().oneshot(multipart_request("XyZ", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let media: MediaAttachment = body_json(resp).await;
    assert_eq!(media.kind, "image");
    assert_eq!(media.description.as_deref(), Some("tmp.jpg"));
}

#[tokio::test]
async fn upload_media_rejects_json_content_type() {
    let resp = app()
        .oneshot(json_request("/api/v1/media", r#"{"file":"x"}"#))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn upload_media_requires_file_field() {
    let body = "--XyZ\r\n\
        Content-Disposition: form-data; name=\"description\"\r\n\r\n\
        nothing\r\n\
        --XyZ--\r\n";
    let resp = app().oneshot(multipart_request("XyZ", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
