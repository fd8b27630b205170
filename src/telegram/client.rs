//! Telegram Bot API client.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::{
    ApiResponse, DeleteWebhookParams, GetUpdatesParams, Message, SendMessageParams,
    SetWebhookParams, Update, User,
};
use crate::config::mask_token;

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Update kinds the bot subscribes to.
pub const ALLOWED_UPDATES: &[&str] = &["message", "edited_message"];

/// Request timeout; must exceed the long-polling timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Bot API request failed: {0}")]
    Http(String),

    #[error("Bot API error {}: {description}", .code.map_or_else(|| "?".to_owned(), |c| c.to_string()))]
    Api {
        code: Option<i64>,
        description: String,
    },

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Bot API returned no result for {0}")]
    MissingResult(&'static str),
}

impl From<reqwest::Error> for TelegramError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL embeds the bot token.
        Self::Http(err.without_url().to_string())
    }
}

/// Extracts flood wait seconds from an error description.
fn extract_flood_wait_seconds(description: &str) -> Option<u32> {
    let patterns = ["retry after ", "FLOOD_WAIT_"];
    let lowered = description.to_lowercase();

    for pattern in patterns {
        if let Some(idx) = lowered.find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = lowered[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// Converts a response envelope into its result or a typed error.
fn into_result<T>(method: &'static str, response: ApiResponse<T>) -> Result<T, TelegramError> {
    if response.ok {
        return response.result.ok_or(TelegramError::MissingResult(method));
    }

    let description = response
        .description
        .unwrap_or_else(|| "no description".to_owned());

    let retry_after = response
        .parameters
        .and_then(|p| p.retry_after)
        .or_else(|| {
            (response.error_code == Some(429))
                .then(|| extract_flood_wait_seconds(&description))
                .flatten()
        });

    if let Some(seconds) = retry_after {
        return Err(TelegramError::FloodWait(seconds));
    }

    Err(TelegramError::Api {
        code: response.error_code,
        description,
    })
}

/// Bot API client bound to one bot token.
#[derive(Clone)]
pub struct TelegramBot {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramBot {
    /// Creates a client for the public Bot API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self, TelegramError> {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Creates a client for a Bot API server at `api_base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_api_base(
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, TelegramError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let api_base: String = api_base.into();

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    async fn call<P, R>(&self, method: &'static str, params: &P) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("Calling Bot API method {}", method);

        let response = self
            .client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await?;

        let status = response.status();
        let envelope: ApiResponse<R> = response.json().await.map_err(|e| {
            TelegramError::Http(format!("{method} answered {status}: {}", e.without_url()))
        })?;

        into_result(method, envelope)
    }

    /// Returns the bot's own account.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Registers `url` as the push-delivery endpoint.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<(), TelegramError> {
        info!("Registering webhook for bot {}", mask_token(&self.token));

        let params = SetWebhookParams {
            url,
            secret_token,
            allowed_updates: ALLOWED_UPDATES,
            drop_pending_updates: false,
        };
        let _: bool = self.call("setWebhook", &params).await?;
        Ok(())
    }

    /// Removes any registered webhook so updates can be polled.
    pub async fn delete_webhook(&self) -> Result<(), TelegramError> {
        let params = DeleteWebhookParams {
            drop_pending_updates: false,
        };
        let _: bool = self.call("deleteWebhook", &params).await?;
        Ok(())
    }

    /// Long-polls for updates with `update_id >= offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdatesParams {
            offset,
            timeout: timeout_secs,
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call("getUpdates", &params).await
    }

    /// Sends a plain-text message.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError> {
        let params = SendMessageParams { chat_id, text };

        match self.call("sendMessage", &params).await {
            Ok(message) => Ok(message),
            Err(e) => {
                if let TelegramError::FloodWait(seconds) = &e {
                    warn!("Flood wait triggered for chat {}: {} seconds", chat_id, seconds);
                }
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot")
            .field("api_base", &self.api_base)
            .field("token", &mask_token(&self.token))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::State;
    use axum::routing::post;
    use axum::Json;
    use serde_json::{Value, json};

    use super::*;

    const TOKEN: &str = "123456:TEST-TOKEN";

    fn envelope<T: DeserializeOwned>(value: Value) -> ApiResponse<T> {
        serde_json::from_value(value).unwrap()
    }

    async fn mock_api(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_extract_flood_wait() {
        assert_eq!(extract_flood_wait_seconds("Too Many Requests: retry after 35"), Some(35));
        assert_eq!(extract_flood_wait_seconds("FLOOD_WAIT_120"), Some(120));
        assert_eq!(extract_flood_wait_seconds("Bad Request: chat not found"), None);
    }

    #[test]
    fn test_extract_flood_wait_non_ascii_description() {
        // 'İ' lowercases to a longer byte sequence.
        assert_eq!(extract_flood_wait_seconds("İİ retry after 5"), Some(5));

        let response = envelope::<bool>(json!({
            "ok": false,
            "error_code": 429,
            "description": "Çok fazla İstek: retry after 7"
        }));
        assert!(matches!(
            into_result("sendMessage", response),
            Err(TelegramError::FloodWait(7))
        ));
    }

    #[test]
    fn test_into_result_ok() {
        let response = envelope::<bool>(json!({"ok": true, "result": true}));
        assert!(into_result("setWebhook", response).unwrap());
    }

    #[test]
    fn test_into_result_missing_result() {
        let response = envelope::<bool>(json!({"ok": true}));
        assert!(matches!(
            into_result("setWebhook", response),
            Err(TelegramError::MissingResult("setWebhook"))
        ));
    }

    #[test]
    fn test_into_result_api_error() {
        let response = envelope::<bool>(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        }));
        let err = into_result("sendMessage", response).unwrap_err();
        assert!(matches!(
            &err,
            TelegramError::Api { code: Some(400), description } if description == "Bad Request: chat not found"
        ));
        assert_eq!(err.to_string(), "Bot API error 400: Bad Request: chat not found");
    }

    #[test]
    fn test_into_result_flood_wait() {
        let with_parameters = envelope::<bool>(json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 7",
            "parameters": {"retry_after": 7}
        }));
        assert!(matches!(
            into_result("sendMessage", with_parameters),
            Err(TelegramError::FloodWait(7))
        ));

        let description_only = envelope::<bool>(json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 12"
        }));
        assert!(matches!(
            into_result("sendMessage", description_only),
            Err(TelegramError::FloodWait(12))
        ));
    }

    #[test]
    fn test_debug_masks_token() {
        let bot = TelegramBot::new(TOKEN).unwrap();
        let rendered = format!("{bot:?}");
        assert!(!rendered.contains("TEST-TOKEN"));
        assert!(rendered.contains("123456:***"));
    }

    #[tokio::test]
    async fn test_send_message_posts_json() {
        let received: Arc<Mutex<Vec<Value>>> = Arc::default();
        let router = Router::new()
            .route(
                &format!("/bot{TOKEN}/sendMessage"),
                post(|State(received): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                    received.lock().unwrap().push(body.clone());
                    Json(json!({
                        "ok": true,
                        "result": {
                            "message_id": 9,
                            "date": 1,
                            "chat": {"id": body["chat_id"], "type": "private"},
                            "text": body["text"]
                        }
                    }))
                }),
            )
            .with_state(Arc::clone(&received));
        let bot = TelegramBot::with_api_base(TOKEN, mock_api(router).await).unwrap();

        let message = bot.send_message(777, "hello").await.unwrap();

        assert_eq!(message.message_id, 9);
        assert_eq!(message.chat.id, 777);
        let bodies = received.lock().unwrap().clone();
        assert_eq!(bodies, vec![json!({"chat_id": 777, "text": "hello"})]);
    }

    #[tokio::test]
    async fn test_error_envelope_with_error_status() {
        let router = Router::new().route(
            &format!("/bot{TOKEN}/getMe"),
            post(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    Json(json!({"ok": false, "error_code": 401, "description": "Unauthorized"})),
                )
            }),
        );
        let bot = TelegramBot::with_api_base(TOKEN, mock_api(router).await).unwrap();

        let err = bot.get_me().await.unwrap_err();

        assert!(matches!(err, TelegramError::Api { code: Some(401), .. }));
    }

    #[tokio::test]
    async fn test_non_json_response_hides_token() {
        let router = Router::new().route(
            &format!("/bot{TOKEN}/getMe"),
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") }),
        );
        let bot = TelegramBot::with_api_base(TOKEN, mock_api(router).await).unwrap();

        let err = bot.get_me().await.unwrap_err();

        let rendered = err.to_string();
        assert!(matches!(err, TelegramError::Http(_)));
        assert!(rendered.contains("502"));
        assert!(!rendered.contains("TEST-TOKEN"));
    }
}
