//! Conversation state and its transitions.
//!
//! [`Session`] holds everything the chat screen shows. Every change goes through
//! [`Session::apply`], which consumes the old state and an [`Action`] and returns
//! the new state together with the [`Effect`] the caller has to carry out
//! (persisting the key, dispatching a remote call). Nothing in here performs I/O.

use std::time::Instant;
use tracing::{info, warn};

use crate::ai::GenerateRequest;
use crate::credential::Credential;
use crate::error::AiError;
use crate::prompt::build_system_instruction;
use crate::state::{Notice, Phase, Transcript, Turn};

pub const GREETING: &str =
    "Hi! I'm Doplhy. Add some text to the Knowledge Base on the left, then ask me a question about it!";
pub const KNOWLEDGE_REQUIRED: &str = "Please provide some text in the 'Knowledge Base' box first!";
pub const GENERIC_FAILURE_REPLY: &str =
    "Sorry, I had a little trouble thinking. Can you try asking again?";
pub const INVALID_KEY_REPLY: &str =
    "It looks like your API key isn't valid. Please check it and try again!";

#[derive(Debug)]
pub enum Action {
    SubmitCredential(String),
    RevokeCredential,
    SetKnowledge(String),
    Send { question: String, now: Instant },
    /// Result of the call dispatched with the matching ticket.
    Resolve { ticket: u64, result: Result<String, AiError> },
    /// Show a status message for the usual notice window.
    Notify { text: String, now: Instant },
    Tick(Instant),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Effect {
    None,
    PersistCredential(Credential),
    ClearCredential,
    Generate { ticket: u64, request: GenerateRequest },
    Rejected(Rejection),
}

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    BlankCredential,
    /// A key is already active; revoke it first.
    GateOpen,
    GateClosed,
    EmptyQuestion,
    Busy,
    MissingKnowledge,
}

#[derive(Debug, Default)]
pub struct Session {
    credential: Option<Credential>,
    model: String,
    knowledge: String,
    transcript: Transcript,
    phase: Phase,
    notice: Option<Notice>,
    ticket: u64,
}

impl Session {
    /// Build the startup state. A stored credential opens the gate right away.
    pub fn new(model: impl Into<String>, knowledge: impl Into<String>, stored: Option<Credential>) -> Self {
        let mut session = Self {
            model: model.into(),
            knowledge: knowledge.into(),
            ..Self::default()
        };
        if let Some(credential) = stored {
            session.open_gate(credential);
        }
        session
    }

    pub fn is_open(&self) -> bool {
        self.credential.is_some()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn knowledge(&self) -> &str {
        &self.knowledge
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_sending(&self) -> bool {
        self.phase == Phase::Sending
    }

    /// The notice, unless it has already expired at `now`.
    pub fn notice(&self, now: Instant) -> Option<&Notice> {
        self.notice.as_ref().filter(|n| !n.is_expired(now))
    }

    pub fn apply(mut self, action: Action) -> (Self, Effect) {
        let effect = match action {
            Action::SubmitCredential(_) if self.is_open() => Effect::Rejected(Rejection::GateOpen),
            Action::SubmitCredential(candidate) => match Credential::parse(&candidate) {
                Some(credential) => {
                    self.open_gate(credential.clone());
                    Effect::PersistCredential(credential)
                }
                None => Effect::Rejected(Rejection::BlankCredential),
            },
            Action::RevokeCredential => {
                self.credential = None;
                self.transcript.clear();
                self.notice = None;
                // Anything still in flight belongs to the old transcript.
                self.phase = Phase::Idle;
                self.ticket += 1;
                Effect::ClearCredential
            }
            Action::SetKnowledge(text) => {
                self.knowledge = text;
                Effect::None
            }
            Action::Send { question, now } => self.send(question, now),
            Action::Resolve { ticket, result } => {
                self.resolve(ticket, result);
                Effect::None
            }
            Action::Notify { text, now } => {
                self.notice = Some(Notice::new(text, now));
                Effect::None
            }
            Action::Tick(now) => {
                if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
                    self.notice = None;
                }
                Effect::None
            }
        };
        (self, effect)
    }

    fn open_gate(&mut self, credential: Credential) {
        self.credential = Some(credential);
        self.transcript.clear();
        self.transcript.push(Turn::model(GREETING));
    }

    fn send(&mut self, question: String, now: Instant) -> Effect {
        let Some(credential) = self.credential.as_ref() else {
            return Effect::Rejected(Rejection::GateClosed);
        };
        if question.trim().is_empty() {
            return Effect::Rejected(Rejection::EmptyQuestion);
        }
        if self.phase == Phase::Sending {
            return Effect::Rejected(Rejection::Busy);
        }
        if self.knowledge.trim().is_empty() {
            self.notice = Some(Notice::new(KNOWLEDGE_REQUIRED, now));
            return Effect::Rejected(Rejection::MissingKnowledge);
        }

        let request = GenerateRequest {
            api_key: credential.expose().to_string(),
            model: self.model.clone(),
            system_instruction: build_system_instruction(&self.knowledge),
            content: question.clone(),
        };

        self.notice = None;
        self.transcript.push(Turn::user(question));
        self.phase = Phase::Sending;
        self.ticket += 1;

        info!(ticket = self.ticket, model = %self.model, "dispatching question");
        Effect::Generate { ticket: self.ticket, request }
    }

    fn resolve(&mut self, ticket: u64, result: Result<String, AiError>) {
        if self.phase != Phase::Sending || ticket != self.ticket {
            info!(ticket, current = self.ticket, "discarding stale reply");
            return;
        }
        self.phase = Phase::Idle;

        let text = match result {
            Ok(text) => {
                info!(ticket, chars = text.chars().count(), "received reply");
                text
            }
            Err(e) if e.is_invalid_credential() => {
                warn!(ticket, error = %e, "API key rejected");
                INVALID_KEY_REPLY.to_string()
            }
            Err(e) => {
                warn!(ticket, error = %e, "generation failed");
                GENERIC_FAILURE_REPLY.to_string()
            }
        };
        self.transcript.push(Turn::model(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Role, NOTICE_WINDOW};
    use reqwest::StatusCode;
    use std::time::Duration;

    fn key() -> Credential {
        Credential::parse("test-key").unwrap()
    }

    fn open_session(knowledge: &str) -> Session {
        Session::new("gemini-2.5-flash", knowledge, Some(key()))
    }

    fn send(session: Session, question: &str) -> (Session, Effect) {
        session.apply(Action::Send { question: question.to_string(), now: Instant::now() })
    }

    fn ticket_of(effect: &Effect) -> u64 {
        match effect {
            Effect::Generate { ticket, .. } => *ticket,
            other => panic!("expected Generate, got {:?}", other),
        }
    }

    #[test]
    fn test_stored_credential_opens_gate_with_greeting() {
        let session = open_session("story");
        assert!(session.is_open());
        assert_eq!(session.transcript().turns(), &[Turn::model(GREETING)]);
    }

    #[test]
    fn test_no_credential_keeps_gate_closed() {
        let session = Session::new("m", "story", None);
        assert!(!session.is_open());
        assert!(session.transcript().is_empty());
    }

    #[test]
    fn test_blank_credential_is_rejected() {
        let (session, effect) = Session::new("m", "story", None)
            .apply(Action::SubmitCredential("   ".to_string()));
        assert_eq!(effect, Effect::Rejected(Rejection::BlankCredential));
        assert!(!session.is_open());
    }

    #[test]
    fn test_submit_persists_trimmed_credential() {
        let (session, effect) = Session::new("m", "story", None)
            .apply(Action::SubmitCredential("  abc  ".to_string()));
        assert_eq!(effect, Effect::PersistCredential(Credential::parse("abc").unwrap()));
        assert_eq!(session.credential().unwrap().expose(), "abc");
    }

    #[test]
    fn test_sky_is_blue_scenario() {
        let (session, effect) = send(open_session("The sky is blue."), "What color is the sky?");

        let Effect::Generate { ticket, request } = effect else {
            panic!("expected a remote call");
        };
        assert!(request.system_instruction.contains("---\nThe sky is blue.\n---"));
        assert_eq!(request.content, "What color is the sky?");
        assert_eq!(request.api_key, "test-key");
        assert_eq!(request.model, "gemini-2.5-flash");
        assert!(session.is_sending());

        let (session, _) = session.apply(Action::Resolve { ticket, result: Ok("Blue!".to_string()) });
        let turns = session.transcript().turns();
        assert_eq!(
            &turns[turns.len() - 2..],
            &[Turn::user("What color is the sky?"), Turn::model("Blue!")]
        );
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_failure_appends_user_then_fallback() {
        let session = open_session("story");
        let before = session.transcript().len();

        let (session, effect) = send(session, "question?");
        let ticket = ticket_of(&effect);
        let (session, _) = session.apply(Action::Resolve { ticket, result: Err(AiError::EmptyReply) });

        assert_eq!(session.transcript().len(), before + 2);
        assert_eq!(session.transcript().turns()[before], Turn::user("question?"));
        assert_eq!(session.transcript().last(), Some(&Turn::model(GENERIC_FAILURE_REPLY)));
        assert!(!session.is_sending());
    }

    #[test]
    fn test_invalid_key_gets_specific_reply() {
        let (session, effect) = send(open_session("story"), "question?");
        let ticket = ticket_of(&effect);
        let err = AiError::Api {
            status: StatusCode::BAD_REQUEST,
            message: "API key not valid. Please pass a valid API key.".to_string(),
        };
        let (session, _) = session.apply(Action::Resolve { ticket, result: Err(err) });

        assert_eq!(session.transcript().last(), Some(&Turn::model(INVALID_KEY_REPLY)));
    }

    #[test]
    fn test_blank_knowledge_shows_notice_without_call() {
        let session = open_session(" \n\t ");
        let before = session.transcript().clone();
        let now = Instant::now();

        let (session, effect) = session.apply(Action::Send { question: "hi?".to_string(), now });
        assert_eq!(effect, Effect::Rejected(Rejection::MissingKnowledge));
        assert_eq!(session.transcript(), &before);
        assert_eq!(session.notice(now).map(|n| n.text.as_str()), Some(KNOWLEDGE_REQUIRED));

        // Gone once the window has passed, even before a tick.
        assert!(session.notice(now + NOTICE_WINDOW).is_none());
        let (session, _) = session.apply(Action::Tick(now + NOTICE_WINDOW + Duration::from_millis(1)));
        assert!(session.notice(now).is_none());
    }

    #[test]
    fn test_send_while_sending_is_rejected() {
        let (session, first) = send(open_session("story"), "one");
        let len = session.transcript().len();

        let (session, second) = send(session, "two");
        assert_eq!(second, Effect::Rejected(Rejection::Busy));
        assert_eq!(session.transcript().len(), len);

        let (session, _) = session.apply(Action::Resolve { ticket: ticket_of(&first), result: Ok("ok".to_string()) });
        assert_eq!(session.transcript().len(), len + 1);

        let (_, third) = send(session, "two");
        assert!(matches!(third, Effect::Generate { .. }));
    }

    #[test]
    fn test_send_requires_open_gate_and_question() {
        let (_, effect) = send(Session::new("m", "story", None), "hi");
        assert_eq!(effect, Effect::Rejected(Rejection::GateClosed));

        let (session, effect) = send(open_session("story"), "   ");
        assert_eq!(effect, Effect::Rejected(Rejection::EmptyQuestion));
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn test_valid_send_clears_notice() {
        let now = Instant::now();
        let (session, _) = open_session("")
            .apply(Action::Send { question: "hi".to_string(), now });
        assert!(session.notice(now).is_some());

        let (session, _) = session.apply(Action::SetKnowledge("story".to_string()));
        let (session, effect) = session.apply(Action::Send { question: "hi".to_string(), now });
        assert!(matches!(effect, Effect::Generate { .. }));
        assert!(session.notice(now).is_none());
    }

    #[test]
    fn test_revoke_clears_transcript_and_reopen_greets_once() {
        let (session, effect) = send(open_session("story"), "q");
        let (session, _) = session.apply(Action::Resolve { ticket: ticket_of(&effect), result: Ok("a".to_string()) });
        assert_eq!(session.transcript().len(), 3);

        let (session, effect) = session.apply(Action::RevokeCredential);
        assert_eq!(effect, Effect::ClearCredential);
        assert!(!session.is_open());
        assert!(session.transcript().is_empty());

        let (session, _) = session.apply(Action::SubmitCredential("new-key".to_string()));
        assert!(session.is_open());
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript().turns()[0].role, Role::Model);
        assert_eq!(session.transcript().turns()[0].text, GREETING);
    }

    #[test]
    fn test_reply_after_revoke_is_discarded() {
        let (session, effect) = send(open_session("story"), "q");
        let stale = ticket_of(&effect);

        let (session, _) = session.apply(Action::RevokeCredential);
        let (session, _) = session.apply(Action::SubmitCredential("k2".to_string()));
        let (session, _) = session.apply(Action::Resolve { ticket: stale, result: Ok("late".to_string()) });

        assert_eq!(session.transcript().turns(), &[Turn::model(GREETING)]);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_submit_while_open_is_rejected() {
        let (session, effect) = send(open_session("story"), "q");
        let ticket = ticket_of(&effect);

        let (session, effect) = session.apply(Action::SubmitCredential("k2".to_string()));
        assert_eq!(effect, Effect::Rejected(Rejection::GateOpen));
        assert_eq!(session.credential().unwrap().expose(), "test-key");
        assert!(session.is_sending());

        let (session, _) = session.apply(Action::Resolve { ticket, result: Ok("reply".to_string()) });
        assert_eq!(
            session.transcript().turns(),
            &[Turn::model(GREETING), Turn::user("q"), Turn::model("reply")]
        );
    }

    #[test]
    fn test_knowledge_edits_are_unconstrained() {
        let (session, _) = open_session("story").apply(Action::SetKnowledge(String::new()));
        assert_eq!(session.knowledge(), "");
    }
}
