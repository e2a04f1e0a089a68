//! Integration tests for the sync client against an in-memory bloom server.

use async_trait::async_trait;
use bloom_sync::{
    ClientConfig, HttpClient, HttpRequest, HttpResponse, MemoryStore, Method, MockHttpClient,
    Outcome, RecordingDisplay, StateContainer, SuccessResponse, SyncClient, SyncError,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Backend {
    passwords: HashMap<String, String>,
    follows: HashMap<String, Vec<String>>,
    tokens: HashMap<String, String>,
    blooms: Vec<Value>,
}

impl Backend {
    fn blooms_by(&self, username: &str) -> Vec<Value> {
        let mut blooms: Vec<Value> = self
            .blooms
            .iter()
            .filter(|b| b["sender"] == username)
            .cloned()
            .collect();
        blooms.reverse();
        blooms
    }

    fn followers_of(&self, username: &str) -> Vec<String> {
        let mut followers: Vec<String> = self
            .follows
            .iter()
            .filter(|(_, follows)| follows.iter().any(|f| f == username))
            .map(|(name, _)| name.clone())
            .collect();
        followers.sort();
        followers
    }
}

/// A bloom server living in memory, reachable through [`HttpClient`].
#[derive(Default)]
struct InMemoryServer {
    backend: Mutex<Backend>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

#[derive(Deserialize)]
struct CredentialsBody {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct BloomBody {
    content: String,
    original_sender: Option<String>,
}

#[derive(Deserialize)]
struct FollowBody {
    follow_username: String,
}

fn unauthorized() -> HttpResponse {
    HttpResponse::json(401, json!({"msg": "Missing Authorization Header"}))
}

impl InMemoryServer {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn register(&self, username: &str, password: &str) {
        let mut backend = self.backend.lock();
        backend
            .passwords
            .insert(username.to_string(), password.to_string());
        backend.follows.insert(username.to_string(), Vec::new());
    }

    fn add_bloom(&self, sender: &str, content: &str) {
        let mut backend = self.backend.lock();
        let id = backend.blooms.len() as i64 + 1;
        backend.blooms.push(json!({
            "id": id,
            "sender": sender,
            "content": content,
            "sent_timestamp": format!("2024-05-01T10:00:{:02}Z", id),
        }));
    }

    fn revoke_tokens(&self) {
        self.backend.lock().tokens.clear();
    }

    fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let viewer = request
            .header("Authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .and_then(|token| self.backend.lock().tokens.get(token).cloned());
        let body: Value = request
            .body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok())
            .unwrap_or(Value::Null);
        let segments: Vec<&str> = request.path().trim_start_matches('/').split('/').collect();

        let mut backend = self.backend.lock();
        match (request.method, segments.as_slice()) {
            (Method::Post, ["register"]) => {
                let creds: CredentialsBody = serde_json::from_value(body).unwrap();
                if creds.password.len() < 5 {
                    return HttpResponse::json(
                        400,
                        json!({"success": false, "message": "Password must be at least 5 characters long"}),
                    );
                }
                if backend.passwords.contains_key(&creds.username) {
                    return HttpResponse::json(
                        400,
                        json!({"success": false, "message": "User already exists"}),
                    );
                }
                backend.passwords.insert(creds.username.clone(), creds.password);
                backend.follows.insert(creds.username.clone(), Vec::new());
                let token = format!("token-{}", creds.username);
                backend.tokens.insert(token.clone(), creds.username);
                HttpResponse::json(200, json!({"success": true, "token": token}))
            }
            (Method::Post, ["login"]) => {
                let creds: CredentialsBody = serde_json::from_value(body).unwrap();
                let matches = backend
                    .passwords
                    .get(&creds.username)
                    .map(|password| *password == creds.password);
                match matches {
                    None => HttpResponse::json(
                        403,
                        json!({"success": false, "message": "Unknown user"}),
                    ),
                    Some(false) => HttpResponse::json(
                        403,
                        json!({"success": false, "message": "Incorrect password"}),
                    ),
                    Some(true) => {
                        let token = format!("token-{}", creds.username);
                        backend.tokens.insert(token.clone(), creds.username);
                        HttpResponse::json(200, json!({"success": true, "token": token}))
                    }
                }
            }
            (Method::Get, ["profile"]) => match viewer {
                Some(me) => HttpResponse::json(
                    200,
                    json!({
                        "username": me,
                        "follows": backend.follows[&me],
                        "followers": backend.followers_of(&me),
                    }),
                ),
                None => unauthorized(),
            },
            (Method::Get, ["profile", name]) => {
                if !backend.passwords.contains_key(*name) {
                    return HttpResponse::json(
                        404,
                        json!({"success": false, "message": format!("User {} not found", name)}),
                    );
                }
                let followers = backend.followers_of(name);
                let blooms = backend.blooms_by(name);
                HttpResponse::json(
                    200,
                    json!({
                        "username": name,
                        "recent_blooms": blooms.iter().take(10).collect::<Vec<_>>(),
                        "follows": backend.follows[*name],
                        "is_following": viewer.as_ref().is_some_and(|v| followers.contains(v)),
                        "is_self": viewer.as_deref() == Some(*name),
                        "total_blooms": blooms.len(),
                        "followers": followers,
                    }),
                )
            }
            (Method::Get, ["blooms", name]) => HttpResponse::json(200, json!(backend.blooms_by(name))),
            (Method::Get, ["bloom", id]) => {
                let found = id
                    .parse::<i64>()
                    .ok()
                    .and_then(|id| backend.blooms.iter().find(|b| b["id"] == id).cloned());
                match found {
                    Some(bloom) => HttpResponse::json(200, bloom),
                    None => HttpResponse::text(404, "Bloom not found"),
                }
            }
            (Method::Get, ["hashtag", tag]) => {
                let needle = format!("#{}", tag);
                let tagged: Vec<Value> = backend
                    .blooms
                    .iter()
                    .filter(|b| {
                        b["content"]
                            .as_str()
                            .is_some_and(|c| c.split_whitespace().any(|w| w == needle))
                    })
                    .cloned()
                    .collect();
                HttpResponse::json(200, json!(tagged))
            }
            (Method::Get, ["home"]) => {
                let Some(me) = viewer else {
                    return unauthorized();
                };
                let mut timeline: Vec<Value> = backend.follows[&me]
                    .iter()
                    .chain(std::iter::once(&me))
                    .flat_map(|name| backend.blooms_by(name))
                    .collect();
                timeline.sort_by(|a, b| {
                    b["sent_timestamp"]
                        .as_str()
                        .cmp(&a["sent_timestamp"].as_str())
                });
                HttpResponse::json(200, json!(timeline))
            }
            (Method::Post, ["bloom"]) => {
                let Some(me) = viewer else {
                    return unauthorized();
                };
                let bloom: BloomBody = serde_json::from_value(body).unwrap();
                let id = backend.blooms.len() as i64 + 1;
                let mut stored = json!({
                    "id": id,
                    "sender": me,
                    "content": bloom.content,
                    "sent_timestamp": format!("2024-05-01T10:00:{:02}Z", id),
                });
                if let Some(original) = bloom.original_sender {
                    stored["original_sender"] = json!(original);
                }
                backend.blooms.push(stored);
                HttpResponse::json(200, json!({"success": true}))
            }
            (Method::Post, ["follow"]) => {
                let Some(me) = viewer else {
                    return unauthorized();
                };
                let target: FollowBody = serde_json::from_value(body).unwrap();
                if !backend.passwords.contains_key(&target.follow_username) {
                    return HttpResponse::text(
                        404,
                        format!(
                            "Cannot follow {} - user does not exist",
                            target.follow_username
                        ),
                    );
                }
                let follows = backend.follows.entry(me).or_default();
                if !follows.contains(&target.follow_username) {
                    follows.push(target.follow_username);
                }
                HttpResponse::json(200, json!({"success": true}))
            }
            (Method::Post, ["unfollow", name]) => {
                let Some(me) = viewer else {
                    return unauthorized();
                };
                backend.follows.entry(me).or_default().retain(|f| f != name);
                HttpResponse::json(200, json!({"success": true}))
            }
            (Method::Get, ["suggested-follows", limit]) => {
                let Some(me) = viewer else {
                    return unauthorized();
                };
                let limit: usize = limit.parse().unwrap_or(0);
                let mut candidates: Vec<&String> = backend
                    .passwords
                    .keys()
                    .filter(|name| **name != me && !backend.follows[&me].contains(*name))
                    .collect();
                candidates.sort();
                let suggestions: Vec<Value> = candidates
                    .into_iter()
                    .take(limit)
                    .map(|name| json!({"username": name}))
                    .collect();
                HttpResponse::json(200, json!(suggestions))
            }
            _ => HttpResponse::text(404, "Not Found"),
        }
    }
}

/// Client-side handle onto a shared [`InMemoryServer`].
struct InMemoryTransport {
    server: Arc<InMemoryServer>,
}

#[async_trait]
impl HttpClient for InMemoryTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let server = &self.server;
        server
            .calls
            .lock()
            .push(format!("{} {}", request.method, request.path()));

        let now = server.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        server.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        server.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(server.handle(&request))
    }
}

type Client<C> = SyncClient<C, MemoryStore>;

fn connect(server: &Arc<InMemoryServer>) -> (Client<InMemoryTransport>, Arc<RecordingDisplay>) {
    let display = Arc::new(RecordingDisplay::new());
    let client = SyncClient::new(
        ClientConfig::new("http://bloom.test"),
        InMemoryTransport {
            server: Arc::clone(server),
        },
        Arc::new(MemoryStore::new()),
        display.clone(),
    );
    (client, display)
}

#[tokio::test]
async fn login_loads_everything_concurrently() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");
    server.register("bob", "password2");
    server.register("cy", "password3");
    server.add_bloom("ada", "first post");

    let (client, display) = connect(&server);
    let outcome = client.login("ada", "password1").await;
    assert!(outcome.is_success());

    let calls = server.calls();
    assert_eq!(calls[0], "POST /login");
    assert_eq!(calls.len(), 4);
    assert!(server.peak_in_flight() >= 3);

    let state = client.state();
    assert!(state.session.is_logged_in);
    assert_eq!(state.session.current_user.as_deref(), Some("ada"));
    assert_eq!(state.timeline_blooms.len(), 1);
    assert_eq!(state.profile("ada").unwrap().total_blooms, Some(1));
    assert_eq!(state.who_to_follow, vec!["bob", "cy"]);
    assert_eq!(display.count(), 0);
}

#[tokio::test]
async fn wrong_password_keeps_logged_out_state() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");

    let (client, display) = connect(&server);
    assert_eq!(client.login("ada", "nope").await, Outcome::Failed);

    assert!(!client.state().session.is_logged_in);
    assert_eq!(
        display.errors(),
        vec![SyncError::response(403, Some("Incorrect password".into()))]
    );
    assert_eq!(client.stats().sessions_cleared, 0);
}

#[tokio::test]
async fn signup_then_post_refreshes_views() {
    let server = InMemoryServer::new();
    let (client, display) = connect(&server);

    assert!(client.signup("ada", "password1").await.is_success());
    assert_eq!(client.state().profile("ada").unwrap().total_blooms, Some(0));

    let outcome = client.post_bloom("hello #rust").await;
    assert_eq!(outcome, Outcome::Success(SuccessResponse { success: true }));

    let state = client.state();
    assert_eq!(state.timeline_blooms.len(), 1);
    assert_eq!(state.timeline_blooms[0].content, "hello #rust");
    assert_eq!(state.profile("ada").unwrap().total_blooms, Some(1));
    assert_eq!(display.count(), 0);

    let calls = server.calls();
    let post = calls.iter().position(|c| c == "POST /bloom").unwrap();
    assert!(calls[post + 1..].contains(&"GET /home".to_string()));
    assert!(calls[post + 1..].contains(&"GET /profile/ada".to_string()));
}

#[tokio::test]
async fn follow_updates_both_profiles_and_timeline() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");
    server.register("bob", "password2");
    server.add_bloom("bob", "bob says hi");

    let (client, _) = connect(&server);
    assert!(client.login("ada", "password1").await.is_success());
    assert!(client.state().timeline_blooms.is_empty());

    assert!(client.follow_user("bob").await.is_success());

    let state = client.state();
    let bob = state.profile("bob").unwrap();
    assert_eq!(bob.followers, Some(vec!["ada".to_string()]));
    assert_eq!(bob.is_following, Some(true));
    assert_eq!(
        state.profile("ada").unwrap().follows,
        Some(vec!["bob".to_string()])
    );
    assert_eq!(state.timeline_blooms.len(), 1);

    assert!(client.unfollow_user("bob").await.is_success());
    let state = client.state();
    assert_eq!(state.profile("bob").unwrap().is_following, Some(false));
    assert!(state.timeline_blooms.is_empty());
}

#[tokio::test]
async fn follow_unknown_user_reports_status() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");

    let (client, display) = connect(&server);
    assert!(client.login("ada", "password1").await.is_success());
    display.take();

    assert_eq!(client.follow_user("zed").await, Outcome::Failed);
    let errors = display.take();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "API error: 404");
    assert!(client.state().session.is_logged_in);
}

#[tokio::test]
async fn revoked_token_tears_down_session() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");

    let (client, display) = connect(&server);
    assert!(client.login("ada", "password1").await.is_success());

    server.revoke_tokens();
    let blooms = client.get_blooms(None).await;

    assert!(blooms.is_empty());
    let state = client.state();
    assert_eq!(state.session.token, None);
    assert_eq!(state.session.current_user, None);
    assert!(!state.session.is_logged_in);
    assert!(state.profiles.is_empty());
    assert_eq!(display.count(), 1);
    assert_eq!(client.stats().sessions_cleared, 1);
}

#[tokio::test]
async fn hashtag_with_and_without_prefix() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");
    server.add_bloom("ada", "learning #rust today");
    server.add_bloom("ada", "nothing tagged");

    let (client, _) = connect(&server);

    let with_hash = client.get_blooms_by_hashtag("#rust").await;
    let state_with = client.state();
    let without_hash = client.get_blooms_by_hashtag("rust").await;
    let state_without = client.state();

    assert_eq!(with_hash, without_hash);
    assert_eq!(with_hash.success().unwrap().len(), 1);
    assert_eq!(state_with.current_hashtag.as_deref(), Some("#rust"));
    assert_eq!(state_with.current_hashtag, state_without.current_hashtag);
    assert_eq!(state_with.hashtag_blooms, state_without.hashtag_blooms);
    assert_eq!(server.calls(), vec!["GET /hashtag/rust", "GET /hashtag/rust"]);
}

#[tokio::test]
async fn rebloom_round_trip() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");
    server.register("bob", "password2");
    server.add_bloom("bob", "worth sharing");

    let (client, _) = connect(&server);
    assert!(client.login("ada", "password1").await.is_success());

    let original = client.get_bloom(1).await.success().unwrap();
    assert_eq!(client.state().single_bloom.as_ref(), Some(&original));

    assert!(client.rebloom(&original).await.is_success());

    let mine = client.get_blooms(Some("ada")).await;
    assert_eq!(mine.len(), 1);
    assert!(mine[0].is_rebloom());
    assert_eq!(mine[0].original_sender.as_deref(), Some("bob"));
    assert_eq!(
        client.state().profile("ada").unwrap().blooms.as_ref(),
        Some(&mine)
    );
}

#[tokio::test]
async fn missing_bloom_fails_without_clearing_session() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");

    let (client, display) = connect(&server);
    assert!(client.login("ada", "password1").await.is_success());

    assert_eq!(client.get_bloom(42).await, Outcome::Failed);
    assert_eq!(client.state().single_bloom, None);
    assert!(client.state().session.is_logged_in);
    assert_eq!(display.count(), 1);
}

#[tokio::test]
async fn self_profile_resolves_current_user() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");

    let (client, _) = connect(&server);
    assert!(client.login("ada", "password1").await.is_success());
    client
        .store()
        .update(bloom_sync::StatePatch::new().current_user(None));

    let identity = client.get_profile(None).await.success().unwrap();
    assert_eq!(identity.username.as_deref(), Some("ada"));
    assert_eq!(identity.total_blooms, None);

    let state = client.state();
    assert_eq!(state.session.current_user.as_deref(), Some("ada"));
    assert_eq!(state.profile("ada").unwrap().is_self, Some(true));
}

#[tokio::test]
async fn logout_then_self_profile_fails() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");

    let (client, display) = connect(&server);
    assert!(client.login("ada", "password1").await.is_success());
    assert!(client.logout().is_success());

    assert_eq!(client.state(), bloom_sync::AppState::default());
    assert_eq!(client.get_profile(None).await, Outcome::Failed);
    assert!(!client.state().session.is_logged_in);
    assert_eq!(display.count(), 1);
}

#[tokio::test]
async fn transport_failure_on_follow() {
    let display = Arc::new(RecordingDisplay::new());
    let client = SyncClient::new(
        ClientConfig::default(),
        MockHttpClient::new(),
        Arc::new(MemoryStore::new()),
        display.clone(),
    );
    client
        .store()
        .update(bloom_sync::StatePatch::logged_in("tok", "ada"));
    client.http().reply_unreachable(Method::Post, "/follow");
    let before = client.state();

    assert_eq!(client.follow_user("bob").await, Outcome::Failed);

    assert_eq!(client.state(), before);
    assert_eq!(display.count(), 1);
    assert!(display.errors()[0].is_transport());
    assert_eq!(client.http().calls(), vec!["POST /follow"]);
}

#[tokio::test]
async fn overlong_bloom_never_reaches_server() {
    let server = InMemoryServer::new();
    server.register("ada", "password1");

    let (client, display) = connect(&server);
    assert!(client.login("ada", "password1").await.is_success());
    let calls_before = server.calls().len();

    assert_eq!(client.post_bloom(&"a".repeat(281)).await, Outcome::Failed);
    assert_eq!(server.calls().len(), calls_before);
    assert_eq!(display.count(), 1);

    assert!(client.post_bloom(&"a".repeat(280)).await.is_success());
}
