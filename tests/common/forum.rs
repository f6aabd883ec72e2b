//! In-process forum stand-in
//!
//! Serves the public routes the checker probes plus the admin API it seeds
//! through, on its own actix system thread. Behaviour can be bent with
//! [`ForumBehaviour`] to produce the failures the checker must catch.

use actix_web::dev::ServerHandle;
use actix_web::http::Method;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

const ADMIN_PREFIX: &str = "/api/admin/";

/// Knobs for making the forum misbehave.
#[derive(Debug, Clone, Default)]
pub struct ForumBehaviour {
    /// Serve /tos even when no terms of use are configured.
    pub ignore_terms_of_use: bool,
    /// Body returned by /ping instead of "200".
    pub ping_body: Option<String>,
    /// Serve feeds that are not well-formed XML.
    pub malformed_feeds: bool,
    /// Serve feeds as text/html.
    pub feeds_as_html: bool,
    /// Refuse to create users.
    pub reject_users: bool,
    /// Answer the reset endpoint with 500.
    pub fail_reset: bool,
    /// Require this bearer token on the admin API.
    pub admin_token: Option<String>,
    /// Delay for GET /slow.
    pub slow_delay: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub cid: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct User {
    pub uid: u64,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct Topic {
    pub tid: u64,
    pub cid: u64,
    pub uid: u64,
    pub title: String,
}

#[derive(Debug, Default)]
pub struct ForumState {
    pub categories: Vec<Category>,
    pub users: Vec<User>,
    pub topics: Vec<Topic>,
    pub config: BTreeMap<String, String>,
    /// Every body received on PUT /config, in order.
    pub config_pushes: Vec<BTreeMap<String, String>>,
    /// "METHOD /path?query" for every request, in order.
    pub requests: Vec<String>,
    pub resets: usize,
    next_id: u64,
}

impl ForumState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn reset(&mut self) {
        self.categories.clear();
        self.users.clear();
        self.topics.clear();
        self.config.clear();
        self.resets += 1;
    }

    /// Index of the first request recorded as exactly `request`.
    pub fn position_of(&self, request: &str) -> Option<usize> {
        self.requests.iter().position(|r| r == request)
    }
}

#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<ForumState>>,
    behaviour: Arc<ForumBehaviour>,
}

pub struct MockForum {
    pub base_url: String,
    pub port: u16,
    state: Arc<Mutex<ForumState>>,
    handle: ServerHandle,
}

impl MockForum {
    pub fn start() -> Self {
        Self::start_with(ForumBehaviour::default())
    }

    pub fn start_with(behaviour: ForumBehaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock forum");
        let port = listener.local_addr().expect("mock forum address").port();

        let state = Arc::new(Mutex::new(ForumState::default()));
        let shared = Shared {
            state: state.clone(),
            behaviour: Arc::new(behaviour),
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            actix_web::rt::System::new().block_on(async move {
                let server = HttpServer::new(move || {
                    App::new()
                        .app_data(web::Data::new(shared.clone()))
                        .default_service(web::to(dispatch))
                })
                .workers(1)
                .disable_signals()
                .listen(listener)
                .expect("listen on mock forum socket")
                .run();

                let _ = tx.send(server.handle());
                let _ = server.await;
            });
        });

        let handle = rx.recv().expect("mock forum did not start");

        MockForum {
            base_url: format!("http://127.0.0.1:{}", port),
            port,
            state,
            handle,
        }
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn state(&self) -> MutexGuard<'_, ForumState> {
        self.state.lock().expect("mock forum state poisoned")
    }
}

impl Drop for MockForum {
    fn drop(&mut self) {
        // The stop command is sent when the future is created
        drop(self.handle.stop(false));
    }
}

async fn dispatch(req: HttpRequest, body: web::Bytes, forum: web::Data<Shared>) -> HttpResponse {
    let path = req.path().to_string();
    let query = req.query_string().to_string();

    {
        let mut state = forum.state.lock().expect("mock forum state poisoned");
        let line = if query.is_empty() {
            format!("{} {}", req.method(), path)
        } else {
            format!("{} {}?{}", req.method(), path, query)
        };
        state.requests.push(line);
    }

    if let Some(endpoint) = path.strip_prefix(ADMIN_PREFIX) {
        return admin(&req, endpoint, &body, &forum);
    }

    if req.method() != Method::GET {
        return HttpResponse::MethodNotAllowed().finish();
    }

    if path == "/slow" {
        if let Some(delay) = forum.behaviour.slow_delay {
            actix_web::rt::time::sleep(delay).await;
        }
        return html("slow page");
    }

    let state = forum.state.lock().expect("mock forum state poisoned");
    page(&state, &forum.behaviour, &path, &query)
}

fn admin(req: &HttpRequest, endpoint: &str, body: &[u8], forum: &Shared) -> HttpResponse {
    if let Some(ref token) = forum.behaviour.admin_token {
        let expected = format!("Bearer {}", token);
        let given = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok());
        if given != Some(expected.as_str()) {
            return HttpResponse::Unauthorized().json(json!({ "error": "bad token" }));
        }
    }

    let payload: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => return HttpResponse::BadRequest().json(json!({ "error": e.to_string() })),
    };

    let mut state = forum.state.lock().expect("mock forum state poisoned");
    let method = req.method();

    match endpoint {
        "categories" if method == Method::POST => {
            let name = payload["name"].as_str().unwrap_or_default().to_string();
            if name.is_empty() {
                return HttpResponse::BadRequest().json(json!({ "error": "name required" }));
            }
            let cid = state.next_id();
            let slug = format!("{}/{}", cid, slug_of(&name));
            state.categories.push(Category {
                cid,
                name,
                slug: slug.clone(),
            });
            HttpResponse::Ok().json(json!({ "cid": cid, "slug": slug }))
        }
        "users" if method == Method::POST => {
            let username = payload["username"].as_str().unwrap_or_default().to_string();
            if forum.behaviour.reject_users
                || username.is_empty()
                || state.users.iter().any(|u| u.username == username)
            {
                return HttpResponse::BadRequest()
                    .json(json!({ "error": "[[error:username-taken]]" }));
            }
            let uid = state.next_id();
            state.users.push(User { uid, username });
            HttpResponse::Ok().json(json!({ "uid": uid }))
        }
        "topics" if method == Method::POST => {
            let uid = payload["uid"].as_u64().unwrap_or_default();
            let cid = payload["cid"].as_u64().unwrap_or_default();
            let known = state.users.iter().any(|u| u.uid == uid)
                && state.categories.iter().any(|c| c.cid == cid);
            if !known {
                return HttpResponse::BadRequest().json(json!({ "error": "[[error:no-category]]" }));
            }
            let tid = state.next_id();
            let title = payload["title"].as_str().unwrap_or_default().to_string();
            state.topics.push(Topic {
                tid,
                cid,
                uid,
                title,
            });
            HttpResponse::Ok().json(json!({ "tid": tid }))
        }
        "config" if method == Method::PUT => {
            let values: BTreeMap<String, String> = match serde_json::from_value(payload) {
                Ok(values) => values,
                Err(e) => {
                    return HttpResponse::BadRequest().json(json!({ "error": e.to_string() }))
                }
            };
            state.config.extend(values.clone());
            state.config_pushes.push(values);
            HttpResponse::Ok().json(json!({}))
        }
        "reset" if method == Method::POST => {
            if forum.behaviour.fail_reset {
                return HttpResponse::InternalServerError().json(json!({ "error": "reset failed" }));
            }
            state.reset();
            HttpResponse::Ok().json(json!({}))
        }
        _ => HttpResponse::NotFound().json(json!({ "error": "unknown admin endpoint" })),
    }
}

fn page(state: &ForumState, behaviour: &ForumBehaviour, path: &str, query: &str) -> HttpResponse {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match segments.as_slice() {
        [""] => home(state),
        ["reset"] | ["reset", _] | ["login"] | ["register"] => html(path),
        ["robots.txt"] => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body("User-agent: *\nDisallow: /admin/\n"),
        ["manifest.json"] => HttpResponse::Ok()
            .content_type("application/manifest+json")
            .body(r#"{"name":"Mock Forum","start_url":"/","display":"minimal-ui"}"#),
        ["outgoing"] => {
            let has_url = query
                .split('&')
                .filter_map(|pair| pair.strip_prefix("url="))
                .any(|value| !value.is_empty());
            if has_url {
                html("You are now leaving the forum")
            } else {
                not_found()
            }
        }
        ["tos"] => {
            let terms = state.config.get("termsOfUse").filter(|t| !t.is_empty());
            match terms {
                Some(terms) => html(terms),
                None if behaviour.ignore_terms_of_use => html("Terms of use"),
                None => not_found(),
            }
        }
        ["sping"] => text("healthy"),
        ["ping"] => text(behaviour.ping_body.as_deref().unwrap_or("200")),
        ["recent.rss"] | ["popular.rss"] | ["recentposts.rss"] => feed(behaviour, path),
        ["popular", term] => match term.strip_suffix(".rss") {
            Some("day" | "week" | "month" | "alltime") => feed(behaviour, path),
            _ => not_found(),
        },
        ["topic", file] => match id_of(file) {
            Some(tid) if state.topics.iter().any(|t| t.tid == tid) => feed(behaviour, path),
            _ => not_found(),
        },
        ["category", file] => match id_of(file) {
            Some(cid) if state.categories.iter().any(|c| c.cid == cid) => feed(behaviour, path),
            _ => not_found(),
        },
        ["category", cid, "recentposts.rss"] => match cid.parse::<u64>() {
            Ok(cid) if state.categories.iter().any(|c| c.cid == cid) => feed(behaviour, path),
            _ => not_found(),
        },
        ["user", username, "topics.rss"] => {
            if state.users.iter().any(|u| u.username == *username) {
                feed(behaviour, path)
            } else {
                not_found()
            }
        }
        _ => not_found(),
    }
}

fn home(state: &ForumState) -> HttpResponse {
    let route = state
        .config
        .get("homePageRoute")
        .map(String::as_str)
        .unwrap_or("");

    match route {
        "" | "categories" | "unread" | "recent" | "popular" => html(&format!("home: {}", route)),
        other => {
            let cid = other
                .strip_prefix("category/")
                .and_then(|rest| rest.split('/').next())
                .and_then(|cid| cid.parse::<u64>().ok());
            match cid {
                Some(cid) if state.categories.iter().any(|c| c.cid == cid) => {
                    html(&format!("home: category {}", cid))
                }
                _ => not_found(),
            }
        }
    }
}

fn id_of(file: &str) -> Option<u64> {
    file.strip_suffix(".rss")?.parse().ok()
}

fn slug_of(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn html(content: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(format!("<!DOCTYPE html><html><body>{}</body></html>", content))
}

fn text(content: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(content.to_string())
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body("<!DOCTYPE html><html><body>Not Found</body></html>")
}

fn feed(behaviour: &ForumBehaviour, path: &str) -> HttpResponse {
    let content_type = if behaviour.feeds_as_html {
        "text/html; charset=utf-8"
    } else {
        "application/rss+xml; charset=utf-8"
    };

    let body = if behaviour.malformed_feeds {
        format!("<rss version=\"2.0\"><channel><title>{}</channel>", path)
    } else {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <rss version=\"2.0\"><channel><title>{}</title><link>http://localhost/</link>\
             <description>mock feed</description>\
             <item><title>test topic title</title><link>http://localhost/topic/1</link></item>\
             </channel></rss>",
            path
        )
    };

    HttpResponse::Ok().content_type(content_type).body(body)
}
