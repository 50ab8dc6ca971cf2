//! HTTP surface over the playback store.
//!
//! tiny_http with a small worker pool: each worker loops on `recv()`, so
//! requests for different channels run in parallel and only meet at the
//! store's shard locks. Every response is JSON with permissive CORS, the
//! overlay players poll from a different origin.

use std::io::Read;
use std::sync::Arc;

use tiny_http::{Header, Method, Request, Response, Server};

use crate::config::ServerConfig;
use crate::constants::MAX_TRACK_BODY_BYTES;
use crate::models::Track;
use crate::store::{PlaybackStore, StoreError};
use crate::utils::time::now_millis;

#[derive(Debug, PartialEq)]
enum Route {
    Health,
    Status { channel: String },
    Play { channel: String },
    Pause { channel: String },
    Switch { channel: String, track_id: String },
    ListTracks { channel: String },
    AddTrack { channel: String },
    RemoveTrack { channel: String, track_id: String },
    Preflight,
    /// Known path, wrong method.
    MethodNotAllowed,
    NotFound,
}

fn parse_route(method: &Method, url: &str) -> Route {
    let path = url.split('?').next().unwrap_or(url);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if method == &Method::Options {
        return Route::Preflight;
    }

    // Paths are matched first so a known path with the wrong method can
    // answer 405 instead of pretending the resource doesn't exist.
    match segments.as_slice() {
        &[] => match method {
            Method::Get => Route::Health,
            _ => Route::MethodNotAllowed,
        },
        &["status", channel] => match method {
            Method::Get => Route::Status {
                channel: channel.to_string(),
            },
            _ => Route::MethodNotAllowed,
        },
        &["control", channel, "play"] => match method {
            Method::Post => Route::Play {
                channel: channel.to_string(),
            },
            _ => Route::MethodNotAllowed,
        },
        &["control", channel, "pause"] => match method {
            Method::Post => Route::Pause {
                channel: channel.to_string(),
            },
            _ => Route::MethodNotAllowed,
        },
        &["admin", channel, "switch", track_id] => match method {
            Method::Post => Route::Switch {
                channel: channel.to_string(),
                track_id: track_id.to_string(),
            },
            _ => Route::MethodNotAllowed,
        },
        &["admin", channel, "tracks"] => match method {
            Method::Get => Route::ListTracks {
                channel: channel.to_string(),
            },
            Method::Post => Route::AddTrack {
                channel: channel.to_string(),
            },
            _ => Route::MethodNotAllowed,
        },
        &["admin", channel, "tracks", track_id] => match method {
            Method::Delete => Route::RemoveTrack {
                channel: channel.to_string(),
                track_id: track_id.to_string(),
            },
            _ => Route::MethodNotAllowed,
        },
        _ => Route::NotFound,
    }
}

/// Bind and serve until the process is killed.
pub fn run(config: &ServerConfig, store: Arc<PlaybackStore>) -> Result<(), Box<dyn std::error::Error>> {
    let server = Server::http(("0.0.0.0", config.port))
        .map_err(|e| format!("Failed to bind port {}: {}", config.port, e))?;
    let server = Arc::new(server);

    log::info!("[Server] Listening on port {}", config.port);
    log::info!(
        "[Server] Status endpoint: http://localhost:{}/status/:channel",
        config.port
    );

    let mut workers = Vec::with_capacity(config.workers);
    for worker_id in 0..config.workers {
        let server = Arc::clone(&server);
        let store = Arc::clone(&store);
        workers.push(std::thread::spawn(move || loop {
            match server.recv() {
                Ok(request) => handle_request(&store, request),
                Err(e) => {
                    log::error!("[Server] Worker {} accept failed: {}", worker_id, e);
                    break;
                }
            }
        }));
    }

    for worker in workers {
        let _ = worker.join();
    }
    Ok(())
}

fn handle_request(store: &PlaybackStore, mut request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();
    log::debug!("[Server] {} {}", method, url);

    let now_ms = now_millis();
    let (code, body) = match parse_route(&method, &url) {
        Route::Health => (
            200,
            serde_json::json!({
                "status": "ok",
                "service": "musync",
                "version": env!("CARGO_PKG_VERSION"),
            })
            .to_string(),
        ),
        Route::Status { channel } => match store.status(&channel, now_ms) {
            Ok(status) => match serde_json::to_string(&status) {
                Ok(json) => (200, json),
                Err(e) => {
                    log::error!("[Server] Failed to encode status: {}", e);
                    (500, error_body("internal error"))
                }
            },
            Err(e) => store_error_response(&channel, e),
        },
        Route::Play { channel } => {
            store.set_playing(&channel, true, now_ms);
            (200, serde_json::json!({ "status": "playing" }).to_string())
        }
        Route::Pause { channel } => {
            store.set_playing(&channel, false, now_ms);
            (200, serde_json::json!({ "status": "paused" }).to_string())
        }
        Route::Switch { channel, track_id } => match store.switch_track(&channel, &track_id, now_ms) {
            Ok(()) => (
                200,
                serde_json::json!({ "status": "switched", "track_id": track_id }).to_string(),
            ),
            Err(e) => store_error_response(&channel, e),
        },
        Route::ListTracks { channel } => {
            let tracks = store.list_tracks(&channel);
            (200, serde_json::json!({ "tracks": tracks }).to_string())
        }
        Route::AddTrack { channel } => handle_add_track(store, &channel, &mut request),
        Route::RemoveTrack { channel, track_id } => match store.remove_track(&channel, &track_id) {
            Ok(()) => (200, serde_json::json!({ "status": "removed" }).to_string()),
            Err(e) => store_error_response(&channel, e),
        },
        Route::Preflight => (204, String::new()),
        Route::MethodNotAllowed => (405, error_body("method not allowed")),
        Route::NotFound => (404, error_body("not found")),
    };

    respond(request, code, body);
}

fn body_within_limit(declared: Option<usize>) -> bool {
    declared.map_or(true, |len| len <= MAX_TRACK_BODY_BYTES)
}

fn handle_add_track(store: &PlaybackStore, channel: &str, request: &mut Request) -> (u16, String) {
    if !body_within_limit(request.body_length()) {
        return (413, error_body("track payload too large"));
    }
    let mut body = String::new();
    // The take guard covers chunked bodies that carry no declared length.
    if let Err(e) = request
        .as_reader()
        .take(MAX_TRACK_BODY_BYTES as u64 + 1)
        .read_to_string(&mut body)
    {
        log::warn!("[Server] Failed to read request body: {}", e);
        return (400, error_body("unreadable body"));
    }
    if body.len() > MAX_TRACK_BODY_BYTES {
        return (413, error_body("track payload too large"));
    }
    match serde_json::from_str::<Track>(&body) {
        Ok(track) => match store.add_track(channel, track) {
            Ok(()) => (201, serde_json::json!({ "status": "added" }).to_string()),
            Err(e) => store_error_response(channel, e),
        },
        Err(e) => (400, error_body(&format!("invalid track payload: {}", e))),
    }
}

fn store_error_response(channel: &str, err: StoreError) -> (u16, String) {
    let code = match err {
        StoreError::NoActiveTrack | StoreError::UnknownTrack(_) => 404,
        StoreError::InvalidTrack(_) => 400,
    };
    log::debug!("[Server] Channel {}: {}", channel, err);
    (code, error_body(&err.to_string()))
}

fn error_body(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn respond(request: Request, code: u16, body: String) {
    let mut response = Response::from_string(body).with_status_code(code);
    for (name, value) in [
        ("Content-Type", "application/json"),
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS"),
        ("Access-Control-Allow-Headers", "Content-Type"),
    ] {
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            response.add_header(header);
        }
    }
    if let Err(e) = request.respond(response) {
        log::warn!("[Server] Failed to send response: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_route() {
        assert_eq!(parse_route(&Method::Get, "/"), Route::Health);
    }

    #[test]
    fn test_status_route() {
        assert_eq!(
            parse_route(&Method::Get, "/status/mychannel"),
            Route::Status {
                channel: "mychannel".to_string()
            }
        );
    }

    #[test]
    fn test_status_route_ignores_query() {
        assert_eq!(
            parse_route(&Method::Get, "/status/mychannel?ts=123"),
            Route::Status {
                channel: "mychannel".to_string()
            }
        );
    }

    #[test]
    fn test_control_routes() {
        assert_eq!(
            parse_route(&Method::Post, "/control/chan/play"),
            Route::Play {
                channel: "chan".to_string()
            }
        );
        assert_eq!(
            parse_route(&Method::Post, "/control/chan/pause"),
            Route::Pause {
                channel: "chan".to_string()
            }
        );
    }

    #[test]
    fn test_switch_route() {
        assert_eq!(
            parse_route(&Method::Post, "/admin/chan/switch/track42"),
            Route::Switch {
                channel: "chan".to_string(),
                track_id: "track42".to_string()
            }
        );
    }

    #[test]
    fn test_library_routes() {
        assert_eq!(
            parse_route(&Method::Get, "/admin/chan/tracks"),
            Route::ListTracks {
                channel: "chan".to_string()
            }
        );
        assert_eq!(
            parse_route(&Method::Post, "/admin/chan/tracks"),
            Route::AddTrack {
                channel: "chan".to_string()
            }
        );
        assert_eq!(
            parse_route(&Method::Delete, "/admin/chan/tracks/t1"),
            Route::RemoveTrack {
                channel: "chan".to_string(),
                track_id: "t1".to_string()
            }
        );
    }

    #[test]
    fn test_wrong_method_on_known_path_is_method_not_allowed() {
        assert_eq!(
            parse_route(&Method::Get, "/control/chan/play"),
            Route::MethodNotAllowed
        );
        assert_eq!(parse_route(&Method::Post, "/status/chan"), Route::MethodNotAllowed);
        assert_eq!(parse_route(&Method::Put, "/admin/chan/tracks"), Route::MethodNotAllowed);
        assert_eq!(
            parse_route(&Method::Get, "/admin/chan/tracks/t1"),
            Route::MethodNotAllowed
        );
        assert_eq!(parse_route(&Method::Post, "/"), Route::MethodNotAllowed);
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        assert_eq!(parse_route(&Method::Get, "/nope/whatever"), Route::NotFound);
        assert_eq!(parse_route(&Method::Post, "/status/chan/extra"), Route::NotFound);
    }

    #[test]
    fn test_body_limit() {
        assert!(body_within_limit(None));
        assert!(body_within_limit(Some(512)));
        assert!(body_within_limit(Some(MAX_TRACK_BODY_BYTES)));
        assert!(!body_within_limit(Some(MAX_TRACK_BODY_BYTES + 1)));
    }
}
