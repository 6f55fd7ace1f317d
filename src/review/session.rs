// # Export Session State
//
// One `ExportSession` lives from the pre-export callback until the summary is
// reported. Asset callbacks may arrive concurrently, so the comment is write-once
// and the submission flag and phase only ever move forward.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

/// Orchestrator state for one session. Ordered so that phases only advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    Idle,
    AwaitingUserInput,
    ExportInProgress,
    JobsScheduled,
    SummaryReady,
}

#[derive(Debug)]
pub struct ExportSession {
    session_id: String,
    comment: OnceLock<String>,
    submission_occurred: AtomicBool,
    phase: Mutex<SessionPhase>,
}

impl ExportSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            comment: OnceLock::new(),
            submission_occurred: AtomicBool::new(false),
            phase: Mutex::new(SessionPhase::Idle),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Store the user's comment. Returns false if one was already stored.
    pub fn set_comment(&self, comment: String) -> bool {
        self.comment.set(comment).is_ok()
    }

    pub fn comment(&self) -> &str {
        self.comment.get().map(String::as_str).unwrap_or("")
    }

    /// Record that at least one publish job was submitted
    pub fn mark_submitted(&self) {
        self.submission_occurred.store(true, Ordering::Release);
    }

    pub fn submission_occurred(&self) -> bool {
        self.submission_occurred.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move to `next` unless the session is already at or past it
    pub fn advance(&self, next: SessionPhase) -> SessionPhase {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if next > *phase {
            debug!(
                session_id = %self.session_id,
                from = ?*phase,
                to = ?next,
                "Session phase change"
            );
            *phase = next;
        }
        *phase
    }

    /// Return to `Idle` after the user cancelled comment entry
    pub(crate) fn cancel(&self) {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        *phase = SessionPhase::Idle;
    }
}

/// Sessions keyed by the host's session id
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<ExportSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session, replacing any stale state under the same id
    pub fn begin(&self, session_id: &str) -> Arc<ExportSession> {
        let session = Arc::new(ExportSession::new(session_id));
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.to_string(), session.clone());
        session
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<ExportSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .cloned()
    }

    /// Remove and return the session
    pub fn finish(&self, session_id: &str) -> Option<Arc<ExportSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_comment_is_write_once() {
        let session = ExportSession::new("s1");
        assert_eq!(session.comment(), "");
        assert!(session.set_comment("first pass".to_string()));
        assert!(!session.set_comment("overwrite".to_string()));
        assert_eq!(session.comment(), "first pass");
    }

    #[test]
    fn test_phase_never_moves_backwards() {
        let session = ExportSession::new("s1");
        session.advance(SessionPhase::JobsScheduled);
        assert_eq!(
            session.advance(SessionPhase::ExportInProgress),
            SessionPhase::JobsScheduled
        );
        session.cancel();
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_submission_flag_survives_concurrent_marks() {
        let session = Arc::new(ExportSession::new("s1"));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = session.clone();
                thread::spawn(move || {
                    if i % 2 == 0 {
                        session.mark_submitted();
                    }
                    session.advance(SessionPhase::JobsScheduled);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(session.submission_occurred());
        assert_eq!(session.phase(), SessionPhase::JobsScheduled);
    }

    #[test]
    fn test_begin_resets_state() {
        let registry = SessionRegistry::new();
        let first = registry.begin("s1");
        first.mark_submitted();

        let second = registry.begin("s1");
        assert!(!second.submission_occurred());
        assert_eq!(registry.len(), 1);

        assert!(registry.finish("s1").is_some());
        assert!(registry.is_empty());
    }
}
