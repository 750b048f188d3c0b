use serde::{Deserialize, Serialize};

/// Maximum number of retained messages; older entries are evicted first.
pub const MAX_MESSAGES: usize = 20;

/// Shown in place of the assistant reply while a turn is in flight.
pub const PENDING_TEXT: &str = "Thinking...";

/// Fallback when the backend cannot be reached at all.
pub const UNAVAILABLE_TEXT: &str =
    "The shopping assistant is currently unavailable. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub origin: Origin,
    pub text: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub prices: Vec<f64>,
    pub session_id: String,
    /// Marks the transient placeholder entry for an in-flight turn.
    /// A dedicated flag rather than matching on the placeholder text,
    /// so a user typing the same string is not swept up by
    /// `replace_pending`.
    #[serde(default)]
    pub pending: bool,
}

impl Message {
    pub fn user(text: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            origin: Origin::User,
            text: text.into(),
            images: Vec::new(),
            prices: Vec::new(),
            session_id: session_id.into(),
            pending: false,
        }
    }

    pub fn assistant(text: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            origin: Origin::Assistant,
            text: text.into(),
            images: Vec::new(),
            prices: Vec::new(),
            session_id: session_id.into(),
            pending: false,
        }
    }

    pub fn pending(session_id: impl Into<String>) -> Self {
        Self {
            origin: Origin::Assistant,
            text: PENDING_TEXT.to_string(),
            images: Vec::new(),
            prices: Vec::new(),
            session_id: session_id.into(),
            pending: true,
        }
    }
}

/// Ordered message list for one browsing session, capped at
/// [`MAX_MESSAGES`]. Messages are only ever appended or filtered,
/// never edited in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// True while a placeholder entry is waiting on the backend.
    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|m| m.pending)
    }

    /// Appends a message, then truncates to the most recent
    /// [`MAX_MESSAGES`] entries (FIFO eviction from the front).
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.truncate_to_cap();
    }

    /// Drops any placeholder left behind by an interrupted turn, such
    /// as a snapshot persisted while a request was still in flight.
    pub fn sweep_pending(&mut self) {
        self.messages.retain(|m| !m.pending);
    }

    /// Resolves the in-flight turn: removes every pending entry, then
    /// appends the resolved message and truncates to the cap.
    pub fn replace_pending(&mut self, resolved: Message) {
        self.messages.retain(|m| !m.pending);
        self.messages.push(resolved);
        self.truncate_to_cap();
    }

    fn truncate_to_cap(&mut self) {
        if self.messages.len() > MAX_MESSAGES {
            let excess = self.messages.len() - MAX_MESSAGES;
            self.messages.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_caps_at_max_with_fifo_eviction() {
        let mut conv = Conversation::new();
        for i in 0..MAX_MESSAGES + 5 {
            conv.append(Message::user(format!("msg {}", i), "s1"));
        }
        assert_eq!(conv.len(), MAX_MESSAGES);
        // Oldest entries dropped first
        assert_eq!(conv.messages()[0].text, "msg 5");
        assert_eq!(conv.last().unwrap().text, format!("msg {}", MAX_MESSAGES + 4));
    }

    #[test]
    fn replace_pending_with_no_placeholder_just_appends() {
        let mut conv = Conversation::new();
        conv.append(Message::user("hi", "s1"));
        conv.replace_pending(Message::assistant("hello", "s1"));
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.last().unwrap().text, "hello");
    }

    #[test]
    fn replace_pending_removes_single_placeholder() {
        let mut conv = Conversation::new();
        conv.append(Message::user("hi", "s1"));
        conv.append(Message::pending("s1"));
        conv.replace_pending(Message::assistant("hello", "s1"));
        assert_eq!(conv.len(), 2);
        assert!(!conv.has_pending());
        assert_eq!(conv.last().unwrap().text, "hello");
    }

    #[test]
    fn replace_pending_removes_every_placeholder() {
        let mut conv = Conversation::new();
        conv.append(Message::user("hi", "s1"));
        conv.append(Message::pending("s1"));
        conv.append(Message::pending("s1"));
        conv.replace_pending(Message::assistant("hello", "s1"));
        assert_eq!(conv.len(), 2);
        assert!(!conv.has_pending());
    }

    #[test]
    fn pending_flag_not_confused_with_placeholder_text() {
        let mut conv = Conversation::new();
        // A user coincidentally typing the sentinel string stays put.
        conv.append(Message::user(PENDING_TEXT, "s1"));
        conv.append(Message::pending("s1"));
        conv.replace_pending(Message::assistant("hello", "s1"));
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages()[0].text, PENDING_TEXT);
        assert_eq!(conv.messages()[0].origin, Origin::User);
    }
}
