use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::ai::{ChatBackend, GenerateRequest};
use crate::credential::{Credential, CredentialStore};
use crate::error::AiError;
use crate::session::{Action, Effect, Rejection, Session};

pub const SAVE_FAILED_NOTICE: &str = "Couldn't save your API key. It will be forgotten when you quit.";

/// A dispatched call that still has to be awaited.
pub struct PendingReply<B: ChatBackend + ?Sized> {
    ticket: u64,
    request: GenerateRequest,
    backend: Arc<B>,
}

impl<B: ChatBackend + ?Sized> PendingReply<B> {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn request(&self) -> &GenerateRequest {
        &self.request
    }

    /// Perform the call. Returns the ticket alongside the result for [`Conversation::finish`].
    pub async fn run(self) -> (u64, Result<String, AiError>) {
        let result = self.backend.generate(&self.request).await;
        (self.ticket, result)
    }
}

/// Owns the [`Session`] and carries out the effects of its transitions.
pub struct Conversation<B: ChatBackend + ?Sized> {
    session: Session,
    backend: Arc<B>,
    store: Box<dyn CredentialStore>,
}

impl<B: ChatBackend + ?Sized> Conversation<B> {
    /// Reads the stored credential once.
    pub fn new(
        backend: Arc<B>,
        store: Box<dyn CredentialStore>,
        model: impl Into<String>,
        knowledge: impl Into<String>,
    ) -> Self {
        let stored = store.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not read stored API key");
            None
        });
        info!(gate_open = stored.is_some(), "starting conversation");

        Self {
            session: Session::new(model, knowledge, stored),
            backend,
            store,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn apply(&mut self, action: Action) -> Effect {
        let session = std::mem::take(&mut self.session);
        let (session, effect) = session.apply(action);
        self.session = session;
        effect
    }

    /// Returns whether the gate opened.
    pub fn submit_credential(&mut self, candidate: &str) -> bool {
        match self.apply(Action::SubmitCredential(candidate.to_string())) {
            Effect::PersistCredential(credential) => {
                self.persist(&credential);
                true
            }
            _ => false,
        }
    }

    fn persist(&mut self, credential: &Credential) {
        if let Err(e) = self.store.save(credential) {
            warn!(error = %e, "failed to store API key");
            self.apply(Action::Notify {
                text: SAVE_FAILED_NOTICE.to_string(),
                now: Instant::now(),
            });
        }
    }

    pub fn revoke(&mut self) {
        if let Effect::ClearCredential = self.apply(Action::RevokeCredential) {
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "failed to remove stored API key");
            }
        }
    }

    pub fn set_knowledge(&mut self, text: impl Into<String>) {
        self.apply(Action::SetKnowledge(text.into()));
    }

    pub fn tick(&mut self, now: Instant) {
        self.apply(Action::Tick(now));
    }

    /// Start an exchange. The user turn is appended before this returns.
    pub fn begin_send(&mut self, question: &str, now: Instant) -> Result<PendingReply<B>, Rejection> {
        match self.apply(Action::Send { question: question.to_string(), now }) {
            Effect::Generate { ticket, request } => Ok(PendingReply {
                ticket,
                request,
                backend: Arc::clone(&self.backend),
            }),
            Effect::Rejected(rejection) => Err(rejection),
            other => {
                warn!(?other, "unexpected effect from send");
                Err(Rejection::Busy)
            }
        }
    }

    /// Fold a finished call back into the transcript.
    pub fn finish(&mut self, ticket: u64, result: Result<String, AiError>) {
        self.apply(Action::Resolve { ticket, result });
    }

    /// One full exchange: dispatch, await, append the reply.
    pub async fn send(&mut self, question: &str) -> Result<(), Rejection> {
        let pending = self.begin_send(question, Instant::now())?;
        let (ticket, result) = pending.run().await;
        self.finish(ticket, result);
        Ok(())
    }
}
