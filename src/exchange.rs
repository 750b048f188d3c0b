use crate::client::{ChatError, ChatRequest, HistoryTurn, ShopClient};
use crate::conversation::{Message, Origin, UNAVAILABLE_TEXT};

/// Maps every message except the last into a role-tagged turn for the
/// backend. Pending placeholders carry no conversational content and
/// are skipped.
pub fn map_history(messages: &[Message]) -> Vec<HistoryTurn> {
    let end = messages.len().saturating_sub(1);
    messages[..end]
        .iter()
        .filter(|m| !m.pending)
        .map(|m| HistoryTurn {
            role: match m.origin {
                Origin::User => "user".to_string(),
                Origin::Assistant => "assistant".to_string(),
            },
            content: m.text.clone(),
        })
        .collect()
}

/// Drives one request/response cycle. The last message is the current
/// user utterance; everything before it is replayed as history. The
/// outcome always comes back as an assistant message ready for
/// `replace_pending` - errors are folded into message text, never
/// surfaced as failures.
pub async fn run_turn(client: &ShopClient, messages: &[Message], session_id: &str) -> Message {
    let prompt = messages
        .last()
        .map(|m| m.text.clone())
        .unwrap_or_default();

    let request = ChatRequest {
        prompt,
        chat_history: map_history(messages),
        session_id: session_id.to_string(),
    };

    match client.generate(&request).await {
        Ok(reply) => {
            let products = reply.products.unwrap_or_default();
            Message {
                origin: Origin::Assistant,
                text: reply.response,
                images: products.iter().map(|p| p.image.clone()).collect(),
                prices: products.iter().map(|p| p.price).collect(),
                session_id: session_id.to_string(),
                pending: false,
            }
        }
        Err(ChatError::Backend { detail }) => {
            Message::assistant(format!("Error: {}", detail), session_id)
        }
        Err(ChatError::Unavailable(_)) => Message::assistant(UNAVAILABLE_TEXT, session_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GENERATE_PATH;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn history_mapping_preserves_order_and_roles() {
        let msgs = vec![
            Message::user("red dress?", "s1"),
            Message::assistant("We have several.", "s1"),
            Message::user("show me more", "s1"),
        ];
        let history = map_history(&msgs);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[0].content, "red dress?");
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[1].content, "We have several.");
    }

    #[test]
    fn history_mapping_skips_pending_entries() {
        let msgs = vec![
            Message::user("hi", "s1"),
            Message::pending("s1"),
            Message::user("still there?", "s1"),
        ];
        let history = map_history(&msgs);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hi");
    }

    #[tokio::test]
    async fn first_turn_sends_empty_history_and_folds_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_json(json!({
                "prompt": "Hello",
                "chat_history": [],
                "session_id": "s1",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Hi there!",
            })))
            .mount(&server)
            .await;

        let client = ShopClient::new(&server.uri());
        let msgs = vec![Message::user("Hello", "s1")];
        let reply = run_turn(&client, &msgs, "s1").await;

        assert_eq!(reply.origin, Origin::Assistant);
        assert_eq!(reply.text, "Hi there!");
        assert!(reply.images.is_empty());
        assert!(reply.prices.is_empty());
        assert!(!reply.pending);
    }

    #[tokio::test]
    async fn products_project_into_parallel_arrays() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Found items",
                "products": [
                    {"image": "a.jpg", "price": 9.99},
                    {"image": "b.jpg", "price": 5},
                ],
            })))
            .mount(&server)
            .await;

        let client = ShopClient::new(&server.uri());
        let msgs = vec![Message::user("any dresses?", "s1")];
        let reply = run_turn(&client, &msgs, "s1").await;

        assert_eq!(reply.text, "Found items");
        assert_eq!(reply.images, vec!["a.jpg", "b.jpg"]);
        assert_eq!(reply.prices, vec![9.99, 5.0]);
    }

    #[tokio::test]
    async fn backend_error_detail_is_surfaced_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "detail": "rate limited",
            })))
            .mount(&server)
            .await;

        let client = ShopClient::new(&server.uri());
        let msgs = vec![Message::user("hi", "s1")];
        let reply = run_turn(&client, &msgs, "s1").await;

        assert_eq!(reply.text, "Error: rate limited");
        assert_eq!(reply.origin, Origin::Assistant);
    }

    #[tokio::test]
    async fn unparseable_error_body_gets_generic_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ShopClient::new(&server.uri());
        let msgs = vec![Message::user("hi", "s1")];
        let reply = run_turn(&client, &msgs, "s1").await;

        assert_eq!(reply.text, "Error: An unknown error occurred.");
    }

    #[tokio::test]
    async fn transport_failure_folds_fixed_unavailability_text() {
        // Nothing listening on this address.
        let client = ShopClient::new("http://127.0.0.1:1");
        let msgs = vec![Message::user("hi", "s1")];
        let reply = run_turn(&client, &msgs, "s1").await;

        assert_eq!(reply.text, UNAVAILABLE_TEXT);
        assert_eq!(reply.origin, Origin::Assistant);
    }
}
