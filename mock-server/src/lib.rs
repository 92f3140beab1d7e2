//! In-memory Pixelfed instance exposing the Mastodon-compatible endpoint
//! subset the client speaks.
//!
//! The single authenticated user is account `1`; requests to authenticated
//! routes must carry `Authorization: Bearer <token>`.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

pub const DEFAULT_TOKEN: &str = "test-token";
pub const SELF_ID: &str = "1";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub acct: String,
    pub display_name: String,
    pub locked: bool,
    pub created_at: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub statuses_count: u64,
    pub note: String,
    pub url: String,
    pub avatar: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    pub preview_url: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub created_at: String,
    pub in_reply_to_id: Option<String>,
    pub sensitive: bool,
    pub spoiler_text: String,
    pub visibility: String,
    pub content: String,
    pub favourites_count: u64,
    pub reblogs_count: u64,
    pub favourited: bool,
    pub account: Account,
    pub media_attachments: Vec<MediaAttachment>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub following: bool,
    pub followed_by: bool,
    pub blocking: bool,
    pub muting: bool,
    pub requested: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    pub account: Account,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Deserialize)]
pub struct CreateStatus {
    pub media_ids: Vec<u64>,
    pub status: Option<String>,
    pub in_reply_to_id: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default = "default_visibility")]
    pub visibility: String,
}

fn default_visibility() -> String {
    "public".to_string()
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
}

struct AccountRecord {
    username: String,
    display_name: String,
}

struct StatusRecord {
    account_id: String,
    content: String,
    visibility: String,
    sensitive: bool,
    in_reply_to_id: Option<String>,
    media_ids: Vec<u64>,
    favourited_by: BTreeSet<String>,
    reblogged_by: BTreeSet<String>,
}

struct NotificationRecord {
    kind: String,
    account_id: String,
}

/// Everything the instance knows. Follow edges are `(follower, followee)`.
pub struct Instance {
    token: String,
    accounts: BTreeMap<String, AccountRecord>,
    statuses: BTreeMap<u64, StatusRecord>,
    media: BTreeMap<u64, MediaAttachment>,
    follows: BTreeSet<(String, String)>,
    blocks: BTreeSet<String>,
    mutes: BTreeSet<String>,
    follow_requests: Vec<String>,
    notifications: Vec<NotificationRecord>,
    next_id: u64,
}

pub type Db = Arc<RwLock<Instance>>;

type ApiError = (StatusCode, Json<ErrorBody>);
type Reply<T> = Result<Json<T>, ApiError>;

const CREATED_AT: &str = "2024-01-01T00:00:00.000000Z";

fn error(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

fn not_found() -> ApiError {
    error(StatusCode::NOT_FOUND, "Record not found")
}

impl Instance {
    fn seeded(token: &str) -> Self {
        let mut accounts = BTreeMap::new();
        for (id, username, display_name) in [
            ("1", "admin", "Admin"),
            ("2", "alice", "Alice"),
            ("3", "bob", "Bob"),
            ("4", "carol", "Carol"),
        ] {
            accounts.insert(
                id.to_string(),
                AccountRecord {
                    username: username.to_string(),
                    display_name: display_name.to_string(),
                },
            );
        }

        let mut media = BTreeMap::new();
        media.insert(100, media_attachment(100, Some("sunset")));

        let mut statuses = BTreeMap::new();
        statuses.insert(
            1,
            StatusRecord {
                account_id: "2".to_string(),
                content: "first post".to_string(),
                visibility: "public".to_string(),
                sensitive: false,
                in_reply_to_id: None,
                media_ids: vec![100],
                favourited_by: BTreeSet::new(),
                reblogged_by: BTreeSet::from(["3".to_string()]),
            },
        );
        statuses.insert(
            2,
            StatusRecord {
                account_id: "3".to_string(),
                content: "quiet post".to_string(),
                visibility: "unlisted".to_string(),
                sensitive: false,
                in_reply_to_id: None,
                media_ids: Vec::new(),
                favourited_by: BTreeSet::new(),
                reblogged_by: BTreeSet::new(),
            },
        );

        Self {
            token: token.to_string(),
            accounts,
            statuses,
            media,
            follows: BTreeSet::from([
                ("2".to_string(), SELF_ID.to_string()),
                (SELF_ID.to_string(), "3".to_string()),
            ]),
            blocks: BTreeSet::new(),
            mutes: BTreeSet::new(),
            follow_requests: vec!["4".to_string()],
            notifications: vec![NotificationRecord {
                kind: "follow".to_string(),
                account_id: "2".to_string(),
            }],
            next_id: 1000,
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let expected = format!("Bearer {}", self.token);
        match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some(value) if value == expected => Ok(()),
            _ => Err(error(StatusCode::UNAUTHORIZED, "Unauthenticated.")),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn account(&self, id: &str) -> Result<Account, ApiError> {
        let record = self.accounts.get(id).ok_or_else(not_found)?;
        Ok(Account {
            id: id.to_string(),
            username: record.username.clone(),
            acct: record.username.clone(),
            display_name: record.display_name.clone(),
            locked: false,
            created_at: CREATED_AT.to_string(),
            followers_count: self.follows.iter().filter(|(_, to)| to == id).count() as u64,
            following_count: self.follows.iter().filter(|(from, _)| from == id).count() as u64,
            statuses_count: self.statuses.values().filter(|s| s.account_id == id).count() as u64,
            note: String::new(),
            url: format!("https://pixelfed.test/{}", record.username),
            avatar: "https://pixelfed.test/storage/avatars/default.jpg".to_string(),
        })
    }

    fn accounts(&self, ids: impl IntoIterator<Item = String>) -> Vec<Account> {
        ids.into_iter().filter_map(|id| self.account(&id).ok()).collect()
    }

    fn status(&self, id: u64) -> Result<Status, ApiError> {
        let record = self.statuses.get(&id).ok_or_else(not_found)?;
        Ok(Status {
            id: id.to_string(),
            created_at: CREATED_AT.to_string(),
            in_reply_to_id: record.in_reply_to_id.clone(),
            sensitive: record.sensitive,
            spoiler_text: String::new(),
            visibility: record.visibility.clone(),
            content: record.content.clone(),
            favourites_count: record.favourited_by.len() as u64,
            reblogs_count: record.reblogged_by.len() as u64,
            favourited: record.favourited_by.contains(SELF_ID),
            account: self.account(&record.account_id)?,
            media_attachments: record
                .media_ids
                .iter()
                .filter_map(|m| self.media.get(m).cloned())
                .collect(),
        })
    }

    /// Newest first.
    fn statuses_where(&self, keep: impl Fn(&StatusRecord) -> bool) -> Vec<Status> {
        self.statuses
            .iter()
            .rev()
            .filter(|(_, s)| keep(s))
            .filter_map(|(id, _)| self.status(*id).ok())
            .collect()
    }

    fn relationship(&self, id: &str) -> Relationship {
        Relationship {
            id: id.to_string(),
            following: self.follows.contains(&(SELF_ID.to_string(), id.to_string())),
            followed_by: self.follows.contains(&(id.to_string(), SELF_ID.to_string())),
            blocking: self.blocks.contains(id),
            muting: self.mutes.contains(id),
            requested: false,
        }
    }
}

fn media_attachment(id: u64, description: Option<&str>) -> MediaAttachment {
    MediaAttachment {
        id: id.to_string(),
        kind: "image".to_string(),
        url: format!("https://pixelfed.test/storage/m/{id}.jpg"),
        preview_url: format!("https://pixelfed.test/storage/m/{id}_thumb.jpg"),
        description: description.map(str::to_string),
    }
}

fn parse_status_id(id: &str) -> Result<u64, ApiError> {
    id.parse().map_err(|_| not_found())
}

pub fn app() -> Router {
    app_with_token(DEFAULT_TOKEN)
}

pub fn app_with_token(token: &str) -> Router {
    let db: Db = Arc::new(RwLock::new(Instance::seeded(token)));
    Router::new()
        .route("/api/nodeinfo/2.0.json", get(nodeinfo))
        .route("/api/v1/instance", get(instance))
        .route("/api/v1/accounts/verify_credentials", get(verify_credentials))
        .route("/api/v1/accounts/search", get(search_accounts))
        .route("/api/v1/accounts/{id}", get(get_account))
        .route("/api/v1/accounts/{id}/followers", get(account_followers))
        .route("/api/v1/accounts/{id}/following", get(account_following))
        .route("/api/v1/accounts/{id}/statuses", get(account_statuses))
        .route("/api/v1/accounts/{id}/{action}", post(account_action))
        .route("/api/v1/blocks", get(blocks))
        .route("/api/v1/mutes", get(mutes))
        .route("/api/v1/follow_requests", get(follow_requests))
        .route("/api/v1/favourites", get(favourites))
        .route("/api/v1/notifications", get(notifications))
        .route("/api/v1/timelines/home", get(home_timeline))
        .route("/api/v1/timelines/public", get(public_timeline))
        .route("/api/v1/statuses", post(create_status))
        .route("/api/v1/statuses/{id}", get(get_status))
        .route("/api/v1/statuses/{id}/reblogged_by", get(reblogged_by))
        .route("/api/v1/statuses/{id}/favourited_by", get(favourited_by))
        .route("/api/v1/statuses/{id}/{action}", post(status_action))
        .route("/api/v1/media", post(upload_media))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn nodeinfo(State(db): State<Db>) -> Json<serde_json::Value> {
    let db = db.read().await;
    Json(serde_json::json!({
        "version": "2.0",
        "software": {"name": "pixelfed", "version": "0.12.3"},
        "protocols": ["activitypub"],
        "services": {"outbound": [], "inbound": []},
        "usage": {
            "localPosts": db.statuses.len(),
            "localComments": 0,
            "users": {"total": db.accounts.len()}
        },
        "openRegistrations": false,
        "metadata": {
            "nodeName": "pixelfed",
            "software": {"homepage": "https://pixelfed.org", "repo": "https://github.com/pixelfed/pixelfed"}
        }
    }))
}

async fn instance(State(db): State<Db>) -> Json<serde_json::Value> {
    let db = db.read().await;
    Json(serde_json::json!({
        "uri": "pixelfed.test",
        "title": "Pixelfed Mock",
        "short_description": "Local test instance",
        "description": "In-memory Pixelfed used by integration tests",
        "email": "admin@pixelfed.test",
        "version": "2.7.2 (compatible; Pixelfed 0.12.3)",
        "registrations": false,
        "stats": {
            "user_count": db.accounts.len(),
            "status_count": db.statuses.len(),
            "domain_count": 0
        }
    }))
}

async fn verify_credentials(State(db): State<Db>, headers: HeaderMap) -> Reply<Account> {
    let db = db.read().await;
    db.authorize(&headers)?;
    db.account(SELF_ID).map(Json)
}

async fn search_accounts(State(db): State<Db>, Query(params): Query<SearchParams>) -> Json<Vec<Account>> {
    let db = db.read().await;
    let needle = params.q.to_lowercase();
    let ids = db
        .accounts
        .iter()
        .filter(|(_, a)| a.username.contains(&needle) || a.display_name.to_lowercase().contains(&needle))
        .map(|(id, _)| id.clone())
        .collect::<Vec<_>>();
    Json(db.accounts(ids))
}

async fn get_account(State(db): State<Db>, Path(id): Path<String>) -> Reply<Account> {
    db.read().await.account(&id).map(Json)
}

async fn account_followers(State(db): State<Db>, Path(id): Path<String>) -> Reply<Vec<Account>> {
    let db = db.read().await;
    db.account(&id)?;
    let ids = db.follows.iter().filter(|(_, to)| *to == id).map(|(from, _)| from.clone());
    Ok(Json(db.accounts(ids.collect::<Vec<_>>())))
}

async fn account_following(State(db): State<Db>, Path(id): Path<String>) -> Reply<Vec<Account>> {
    let db = db.read().await;
    db.account(&id)?;
    let ids = db.follows.iter().filter(|(from, _)| *from == id).map(|(_, to)| to.clone());
    Ok(Json(db.accounts(ids.collect::<Vec<_>>())))
}

async fn account_statuses(State(db): State<Db>, Path(id): Path<String>) -> Reply<Vec<Status>> {
    let db = db.read().await;
    db.account(&id)?;
    Ok(Json(db.statuses_where(|s| s.account_id == id)))
}

async fn account_action(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, action)): Path<(String, String)>,
) -> Reply<Relationship> {
    let mut db = db.write().await;
    db.authorize(&headers)?;
    db.account(&id)?;
    let edge = (SELF_ID.to_string(), id.clone());
    match action.as_str() {
        "follow" => {
            db.follows.insert(edge);
        }
        "unfollow" => {
            db.follows.remove(&edge);
        }
        "block" => {
            db.follows.remove(&edge);
            db.follows.remove(&(id.clone(), SELF_ID.to_string()));
            db.blocks.insert(id.clone());
        }
        "unblock" => {
            db.blocks.remove(&id);
        }
        "mute" => {
            db.mutes.insert(id.clone());
        }
        "unmute" => {
            db.mutes.remove(&id);
        }
        _ => return Err(not_found()),
    }
    tracing::debug!(%id, %action, "relationship changed");
    Ok(Json(db.relationship(&id)))
}

async fn blocks(State(db): State<Db>, headers: HeaderMap) -> Reply<Vec<Account>> {
    let db = db.read().await;
    db.authorize(&headers)?;
    Ok(Json(db.accounts(db.blocks.iter().cloned())))
}

async fn mutes(State(db): State<Db>, headers: HeaderMap) -> Reply<Vec<Account>> {
    let db = db.read().await;
    db.authorize(&headers)?;
    Ok(Json(db.accounts(db.mutes.iter().cloned())))
}

async fn follow_requests(State(db): State<Db>, headers: HeaderMap) -> Reply<Vec<Account>> {
    let db = db.read().await;
    db.authorize(&headers)?;
    Ok(Json(db.accounts(db.follow_requests.iter().cloned())))
}

async fn favourites(State(db): State<Db>, headers: HeaderMap) -> Reply<Vec<Status>> {
    let db = db.read().await;
    db.authorize(&headers)?;
    Ok(Json(db.statuses_where(|s| s.favourited_by.contains(SELF_ID))))
}

async fn notifications(State(db): State<Db>, headers: HeaderMap) -> Reply<Vec<Notification>> {
    let db = db.read().await;
    db.authorize(&headers)?;
    let list = db
        .notifications
        .iter()
        .enumerate()
        .filter_map(|(i, n)| {
            Some(Notification {
                id: (i + 1).to_string(),
                kind: n.kind.clone(),
                created_at: CREATED_AT.to_string(),
                account: db.account(&n.account_id).ok()?,
            })
        })
        .collect();
    Ok(Json(list))
}

async fn home_timeline(State(db): State<Db>, headers: HeaderMap) -> Reply<Vec<Status>> {
    let db = db.read().await;
    db.authorize(&headers)?;
    let timeline = db.statuses_where(|s| {
        s.account_id == SELF_ID
            || db
                .follows
                .contains(&(SELF_ID.to_string(), s.account_id.clone()))
    });
    Ok(Json(timeline))
}

async fn public_timeline(State(db): State<Db>) -> Json<Vec<Status>> {
    let db = db.read().await;
    Json(db.statuses_where(|s| s.visibility == "public"))
}

async fn create_status(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateStatus>,
) -> Reply<Status> {
    let mut db = db.write().await;
    db.authorize(&headers)?;
    if input.media_ids.is_empty() || input.media_ids.iter().any(|m| !db.media.contains_key(m)) {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid media_ids"));
    }
    if !["public", "unlisted", "private"].contains(&input.visibility.as_str()) {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid visibility"));
    }
    let id = db.next_id();
    db.statuses.insert(
        id,
        StatusRecord {
            account_id: SELF_ID.to_string(),
            content: input.status.unwrap_or_default(),
            visibility: input.visibility,
            sensitive: input.sensitive,
            in_reply_to_id: input.in_reply_to_id,
            media_ids: input.media_ids,
            favourited_by: BTreeSet::new(),
            reblogged_by: BTreeSet::new(),
        },
    );
    tracing::debug!(id, "status created");
    db.status(id).map(Json)
}

async fn get_status(State(db): State<Db>, Path(id): Path<String>) -> Reply<Status> {
    db.read().await.status(parse_status_id(&id)?).map(Json)
}

async fn reblogged_by(State(db): State<Db>, Path(id): Path<String>) -> Reply<Vec<Account>> {
    let db = db.read().await;
    let record = db.statuses.get(&parse_status_id(&id)?).ok_or_else(not_found)?;
    Ok(Json(db.accounts(record.reblogged_by.iter().cloned())))
}

async fn favourited_by(State(db): State<Db>, Path(id): Path<String>) -> Reply<Vec<Account>> {
    let db = db.read().await;
    let record = db.statuses.get(&parse_status_id(&id)?).ok_or_else(not_found)?;
    Ok(Json(db.accounts(record.favourited_by.iter().cloned())))
}

async fn status_action(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, action)): Path<(String, String)>,
) -> Reply<Status> {
    let mut db = db.write().await;
    db.authorize(&headers)?;
    let id = parse_status_id(&id)?;
    let record = db.statuses.get_mut(&id).ok_or_else(not_found)?;
    match action.as_str() {
        "favourite" => {
            record.favourited_by.insert(SELF_ID.to_string());
        }
        "unfavourite" => {
            record.favourited_by.remove(SELF_ID);
        }
        _ => return Err(not_found()),
    }
    db.status(id).map(Json)
}

async fn upload_media(
    State(db): State<Db>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Reply<MediaAttachment> {
    db.read().await.authorize(&headers)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, &e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| error(StatusCode::BAD_REQUEST, &e.body_text()))?;
        upload = Some((filename, bytes.len()));
    }

    let Some((filename, size)) = upload else {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "The file field is required."));
    };
    if size == 0 {
        return Err(error(StatusCode::UNPROCESSABLE_ENTITY, "The file must not be empty."));
    }

    let mut db = db.write().await;
    let id = db.next_id();
    let attachment = media_attachment(id, Some(&filename));
    db.media.insert(id, attachment.clone());
    tracing::debug!(id, size, %filename, "media stored");
    Ok(Json(attachment))
}
