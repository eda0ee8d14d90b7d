// HTTP relay server: `POST /api/notes` and `GET /api/health`

pub mod relay;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::CompletionProvider;

/// State shared by every relay request. Holds no per-request data.
#[derive(Clone)]
pub struct RelayState {
    pub provider: Arc<dyn CompletionProvider>,
    pub idle_timeout: Duration,
}

impl RelayState {
    pub fn new(provider: Arc<dyn CompletionProvider>, idle_timeout: Duration) -> Self {
        Self {
            provider,
            idle_timeout,
        }
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/api/notes", post(relay::generate_notes))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C
pub async fn serve(addr: SocketAddr, state: RelayState) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Note relay listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Relay server failed")?;

    info!("Note relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}


#[cfg(test)]
mod tests {
    use super::testing::spawn_relay;
    use crate::api::fake::{EndlessProvider, ScriptedProvider};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_health_endpoint() {
        let base = spawn_relay(ScriptedProvider::new(&[])).await;
        let body = reqwest::get(format!("{base}/api/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_notes_response_headers() {
        let base = spawn_relay(ScriptedProvider::new(&["hello"])).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/notes"))
            .json(&serde_json::json!({"prompt": "{\"content\":\"+x\"}", "mode": "Developer"}))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        let headers = response.headers();
        assert_eq!(headers["content-type"], "text/event-stream");
        assert_eq!(headers["cache-control"], "no-cache, no-transform");

        let body = response.text().await.unwrap();
        assert_eq!(body, "data: {\"content\":\"hello\"}\n\ndata: [DONE]\n\n");
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_error() {
        let base = spawn_relay(ScriptedProvider::new(&["unused"])).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/notes"))
            .header("content-type", "application/json")
            .body("{\"prompt\": ")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 400);
        assert_eq!(response.headers()["content-type"], "application/json");
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_unknown_mode_still_streams() {
        let base = spawn_relay(ScriptedProvider::new(&["notes"])).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/notes"))
            .json(&serde_json::json!({"prompt": "diff", "mode": "Investor"}))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert!(response.text().await.unwrap().ends_with("data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn test_client_disconnect_releases_upstream() {
        let released = Arc::new(AtomicBool::new(false));
        let base = spawn_relay(EndlessProvider {
            released: Arc::clone(&released),
        })
        .await;

        let mut response = reqwest::Client::new()
            .post(format!("{base}/api/notes"))
            .json(&serde_json::json!({"prompt": "diff", "mode": "Developer"}))
            .send()
            .await
            .unwrap();

        let first = response.chunk().await.unwrap().unwrap();
        assert!(String::from_utf8_lossy(&first).starts_with("data: {\"content\":\"tick \"}"));
        assert!(!released.load(Ordering::SeqCst));

        drop(response);

        let wait = tokio::time::timeout(Duration::from_secs(5), async {
            while !released.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(wait.is_ok(), "upstream stream was not dropped with the connection");
    }
}
