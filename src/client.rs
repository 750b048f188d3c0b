use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GENERATE_PATH: &str = "/generate-response";

/// One prior turn replayed to the backend. Only the text goes back;
/// images and prices are never replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub chat_history: Vec<HistoryTurn>,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Product {
    pub image: String,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub products: Option<Vec<Product>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug, Error)]
pub enum ChatError {
    /// Non-success status from the backend, with its human-readable
    /// detail when the error body parsed (a generic fallback when it
    /// did not).
    #[error("backend error: {detail}")]
    Backend { detail: String },
    /// No usable response at all (connect failure, timeout, or an
    /// unreadable success body).
    #[error("shop backend unreachable")]
    Unavailable(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct ShopClient {
    client: Client,
    base_url: String,
}

impl ShopClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Issues one turn request. Never retries.
    pub async fn generate(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        let url = format!("{}{}", self.base_url, GENERATE_PATH);

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.detail)
                .unwrap_or_else(|_| "An unknown error occurred.".to_string());
            return Err(ChatError::Backend { detail });
        }

        let reply: ChatReply = response.json().await?;
        Ok(reply)
    }
}
