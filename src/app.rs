use crate::client::ShopClient;
use crate::conversation::Message;
use crate::store::{Session, SnapshotStore};
use crate::exchange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Explicit turn guard: submissions made while a turn is in flight
/// are rejected rather than queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Submitting,
}

pub struct App<S: SnapshotStore> {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input state
    pub input: String,
    pub cursor: usize, // cursor position in chars

    // Chat state
    pub session: Session<S>,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    client: ShopClient,
    turn_task: Option<tokio::task::JoinHandle<Message>>,
}

impl<S: SnapshotStore> App<S> {
    pub fn new(session: Session<S>, client: ShopClient) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            input: String::new(),
            cursor: 0,
            session,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            client,
            turn_task: None,
        }
    }

    pub fn turn_state(&self) -> TurnState {
        if self.turn_task.is_some() {
            TurnState::Submitting
        } else {
            TurnState::Idle
        }
    }

    /// Submits the current input as a new turn. Whitespace-only input
    /// is a no-op, as is submitting while the prior turn is still in
    /// flight. Returns whether a turn was started.
    pub fn submit(&mut self) -> bool {
        let text = self.input.trim().to_string();
        if text.is_empty() || self.turn_state() == TurnState::Submitting {
            return false;
        }

        self.input.clear();
        self.cursor = 0;

        let session_id = self.session.session_id().to_string();
        self.session
            .conversation
            .append(Message::user(text, &session_id));
        // Snapshot before the placeholder goes in; the request carries
        // the user message as its final element, never the placeholder.
        let history: Vec<Message> = self.session.conversation.messages().to_vec();
        self.session.conversation.append(Message::pending(&session_id));
        self.session.persist();
        self.scroll_to_bottom();

        let client = self.client.clone();
        self.turn_task = Some(tokio::spawn(async move {
            exchange::run_turn(&client, &history, &session_id).await
        }));
        true
    }

    /// Folds a finished turn back into the conversation. Called on
    /// every tick; does nothing while the request is still running.
    pub async fn poll_turn(&mut self) {
        let finished = self
            .turn_task
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.turn_task.take() {
            let resolved = match task.await {
                Ok(message) => message,
                // The task itself died; treat like an unreachable backend.
                Err(_) => Message::assistant(
                    crate::conversation::UNAVAILABLE_TEXT,
                    self.session.session_id(),
                ),
            };
            self.session.conversation.replace_pending(resolved);
            self.session.persist();
            self.scroll_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.turn_state() == TurnState::Submitting {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Scroll chat so the newest entry (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.session.conversation.messages() {
            total_lines += 1; // Role line ("You:" or "Shop:")
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += msg.images.len() as u16; // One line per product
            total_lines += 1; // Blank line after message
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }
}
