//! Webhook listener for push-delivered updates.

use std::future::Future;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::{Update, UpdateDispatcher};

/// Header Telegram uses to echo the webhook secret.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// State shared with the webhook handler.
#[derive(Debug, Clone)]
pub struct WebhookState {
    dispatcher: UpdateDispatcher,
    secret_token: Option<Arc<str>>,
}

impl WebhookState {
    #[must_use]
    pub fn new(dispatcher: UpdateDispatcher, secret_token: Option<&str>) -> Self {
        Self {
            dispatcher,
            secret_token: secret_token.map(Arc::from),
        }
    }

    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.secret_token.as_deref() else {
            return true;
        };

        headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|given| given == expected)
    }
}

/// Builds the router: `POST {path}` for updates, `GET /health` for health checks.
pub fn router(path: &str, state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(path, post(receive_update))
        .with_state(state)
}

/// Serves `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Webhook listener on {}", addr);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> &'static str {
    "ok"
}

/// Accepts one update and answers immediately; the command runs on its own task.
async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    if !state.is_authorized(&headers) {
        warn!(update_id = update.update_id, "Rejected webhook call with wrong secret token");
        return StatusCode::UNAUTHORIZED;
    }

    state.dispatcher.spawn(update);
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::commands::CommandHandler;
    use crate::listings::{Listing, ListingSource, SearchFilter};
    use crate::telegram::TelegramBot;

    const TOKEN: &str = "123456:TEST-TOKEN";

    #[derive(Debug)]
    struct TwoListings;

    #[async_trait]
    impl ListingSource for TwoListings {
        async fn search(&self, filter: &SearchFilter) -> Vec<Listing> {
            (1..=2)
                .map(|i| Listing {
                    title: format!("{} flat {i}", filter.city),
                    price: "500 €".to_owned(),
                    url: format!("https://www.immowelt.de/expose/{i}"),
                })
                .collect()
        }
    }

    type Sent = Arc<Mutex<Vec<Value>>>;

    async fn spawn_server(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    /// Fake Bot API recording `sendMessage` bodies.
    async fn fake_bot_api(sent: Sent) -> Arc<TelegramBot> {
        let router = Router::new()
            .route(
                &format!("/bot{TOKEN}/sendMessage"),
                post(|State(sent): State<Sent>, Json(body): Json<Value>| async move {
                    sent.lock().unwrap().push(body.clone());
                    Json(json!({
                        "ok": true,
                        "result": {"message_id": 1, "date": 0, "chat": {"id": body["chat_id"], "type": "private"}}
                    }))
                }),
            )
            .with_state(sent);
        let addr = spawn_server(router).await;
        Arc::new(TelegramBot::with_api_base(TOKEN, format!("http://{addr}")).unwrap())
    }

    async fn webhook(secret: Option<&str>, sent: Sent) -> SocketAddr {
        let bot = fake_bot_api(sent).await;
        let handler = Arc::new(CommandHandler::new(Arc::new(TwoListings), 5));
        let state = WebhookState::new(UpdateDispatcher::new(bot, handler), secret);
        spawn_server(router(&format!("/{TOKEN}"), state)).await
    }

    fn filter_update() -> Value {
        json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "date": 0,
                "chat": {"id": 42, "type": "private"},
                "text": "/filter berlin 400 800"
            }
        })
    }

    async fn wait_for_messages(sent: &Sent, count: usize) -> Vec<Value> {
        for _ in 0..100 {
            let current = sent.lock().unwrap().clone();
            if current.len() >= count {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        sent.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_update_is_dispatched() {
        let sent: Sent = Arc::default();
        let addr = webhook(None, Arc::clone(&sent)).await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/{TOKEN}"))
            .json(&filter_update())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let messages = wait_for_messages(&sent, 3).await;
        let texts: Vec<&str> = messages.iter().filter_map(|m| m["text"].as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Searching for flats in berlin from 400€ to 800€... please wait ⏳",
                "berlin flat 1\n500 €\nhttps://www.immowelt.de/expose/1",
                "berlin flat 2\n500 €\nhttps://www.immowelt.de/expose/2",
            ]
        );
        assert!(messages.iter().all(|m| m["chat_id"] == 42));
    }

    #[tokio::test]
    async fn test_wrong_secret_is_rejected() {
        let sent: Sent = Arc::default();
        let addr = webhook(Some("s3cret"), Arc::clone(&sent)).await;
        let client = reqwest::Client::new();

        let missing = client
            .post(format!("http://{addr}/{TOKEN}"))
            .json(&filter_update())
            .send()
            .await
            .unwrap();
        let wrong = client
            .post(format!("http://{addr}/{TOKEN}"))
            .header(SECRET_TOKEN_HEADER, "guess")
            .json(&filter_update())
            .send()
            .await
            .unwrap();

        assert_eq!(missing.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.status(), reqwest::StatusCode::UNAUTHORIZED);

        let right = client
            .post(format!("http://{addr}/{TOKEN}"))
            .header(SECRET_TOKEN_HEADER, "s3cret")
            .json(&filter_update())
            .send()
            .await
            .unwrap();
        assert_eq!(right.status(), reqwest::StatusCode::OK);
        assert_eq!(wait_for_messages(&sent, 3).await.len(), 3);
    }

    #[tokio::test]
    async fn test_other_paths_are_not_served() {
        let sent: Sent = Arc::default();
        let addr = webhook(None, Arc::clone(&sent)).await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/not-the-token"))
            .json(&filter_update())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let addr = webhook(None, Arc::default()).await;

        let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_non_command_update_sends_nothing() {
        let sent: Sent = Arc::default();
        let addr = webhook(None, Arc::clone(&sent)).await;

        let response = reqwest::Client::new()
            .post(format!("http://{addr}/{TOKEN}"))
            .json(&json!({
                "update_id": 2,
                "message": {"message_id": 11, "date": 0, "chat": {"id": 42, "type": "private"}, "text": "hello"}
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sent.lock().unwrap().is_empty());
    }
}
