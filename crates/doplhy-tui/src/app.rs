use ratatui::layout::Rect;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use doplhy_core::{AiError, ChatBackend, Conversation, Rejection, Role, Session};

use crate::textedit::{wrap_chars, TextArea, TextInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    KeyGate,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Question,
    Knowledge,
    Transcript,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Question => FocusPane::Knowledge,
            FocusPane::Knowledge => FocusPane::Transcript,
            FocusPane::Transcript => FocusPane::Question,
        }
    }
}

/// One display row of the chat panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRow {
    Speaker(Role),
    Text(String),
    Blank,
    Thinking,
}

type ReplyTask = JoinHandle<(u64, Result<String, AiError>)>;

pub struct App {
    pub should_quit: bool,
    pub focus: FocusPane,

    // Gate form
    pub key_input: TextInput,

    // Knowledge panel
    pub knowledge: TextArea,
    pub knowledge_scroll: u16,
    pub knowledge_follow: bool, // Keep the cursor row in view

    // Chat panel
    pub question: TextInput,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_chat: bool,
    pending: Option<(u64, ReplyTask)>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub knowledge_area: Option<Rect>,
    pub chat_area: Option<Rect>,

    conversation: Conversation<dyn ChatBackend>,
}

impl App {
    pub fn new(conversation: Conversation<dyn ChatBackend>) -> Self {
        let knowledge = TextArea::new(conversation.session().knowledge());

        Self {
            should_quit: false,
            focus: FocusPane::Question,

            key_input: TextInput::new(),

            knowledge,
            knowledge_scroll: 0,
            knowledge_follow: true,

            question: TextInput::new(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_chat: true,
            pending: None,

            animation_frame: 0,

            knowledge_area: None,
            chat_area: None,

            conversation,
        }
    }

    pub fn session(&self) -> &Session {
        self.conversation.session()
    }

    pub fn screen(&self) -> Screen {
        if self.session().is_open() {
            Screen::Chat
        } else {
            Screen::KeyGate
        }
    }

    pub fn is_sending(&self) -> bool {
        self.session().is_sending()
    }

    pub fn submit_key(&mut self) {
        if self.conversation.submit_credential(self.key_input.as_str()) {
            self.key_input.clear();
            self.focus = FocusPane::Question;
            self.chat_scroll = 0;
            self.follow_chat = true;
        }
    }

    pub fn change_key(&mut self) {
        self.conversation.revoke();
        // The reply of a revoked session is discarded anyway.
        self.pending = None;
        self.question.clear();
        self.chat_scroll = 0;
    }

    /// Push the editor contents into the session after an edit.
    pub fn sync_knowledge(&mut self) {
        self.conversation.set_knowledge(self.knowledge.as_str());
    }

    pub fn send_question(&mut self) {
        match self.conversation.begin_send(self.question.as_str(), Instant::now()) {
            Ok(pending) => {
                debug!(ticket = pending.ticket(), request = ?pending.request(), "spawning reply task");
                self.question.clear();
                let ticket = pending.ticket();
                self.pending = Some((ticket, tokio::spawn(pending.run())));
                self.follow_chat = true;
            }
            Err(Rejection::MissingKnowledge) => {
                debug!("send blocked, knowledge base is empty");
            }
            Err(rejection) => {
                debug!(?rejection, "send ignored");
            }
        }
    }

    /// Fold a finished reply task back into the conversation.
    pub async fn poll_pending(&mut self) {
        let finished = matches!(&self.pending, Some((_, handle)) if handle.is_finished());
        if !finished {
            return;
        }
        let Some((ticket, handle)) = self.pending.take() else {
            return;
        };

        match handle.await {
            Ok((ticket, result)) => self.conversation.finish(ticket, result),
            Err(e) => {
                warn!(ticket, error = %e, "reply task failed");
                self.conversation.finish(ticket, Err(AiError::TaskFailed(e.to_string())));
            }
        }
        self.follow_chat = true;
    }

    /// Tick animation frame and expire notices (called by Tick event)
    pub fn tick(&mut self) {
        if self.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.conversation.tick(Instant::now());
    }

    pub fn notice_text(&self) -> Option<&str> {
        self.session().notice(Instant::now()).map(|n| n.text.as_str())
    }

    /// Chat panel contents, hard-wrapped to the current chat width.
    pub fn chat_rows(&self) -> Vec<ChatRow> {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut rows = Vec::new();
        for turn in self.session().transcript().turns() {
            rows.push(ChatRow::Speaker(turn.role));
            for line in turn.text.lines() {
                rows.extend(wrap_chars(line, wrap_width).into_iter().map(ChatRow::Text));
            }
            rows.push(ChatRow::Blank);
        }

        if self.is_sending() {
            rows.push(ChatRow::Speaker(Role::Model));
            rows.push(ChatRow::Thinking);
        }

        rows
    }

    pub fn chat_line_count(&self) -> u16 {
        self.chat_rows().len().min(u16::MAX as usize) as u16
    }

    pub fn scroll_chat_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = self.chat_line_count().saturating_sub(visible_height);
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        let max = self.chat_line_count().saturating_sub(visible_height);
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_chat = self.chat_scroll >= max;
    }
}
