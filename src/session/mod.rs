//! Session history tracking
//!
//! A bounded append-only log of question/answer exchanges keyed by session
//! id. The generation loop consumes it only as an opaque formatted string.

use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory session store with a per-session exchange cap
pub struct SessionManager {
    max_history: usize,
    sessions: Mutex<HashMap<String, Vec<(String, String)>>>,
}

impl SessionManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new session and return its id
    pub fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .unwrap()
            .insert(id.clone(), Vec::new());
        id
    }

    /// Append one question/answer exchange, trimming to the history cap
    pub fn add_exchange(&self, session_id: &str, question: &str, answer: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        let log = sessions.entry(session_id.to_string()).or_default();
        log.push((question.to_string(), answer.to_string()));

        if log.len() > self.max_history {
            let excess = log.len() - self.max_history;
            log.drain(..excess);
        }
    }

    /// Format a session's history for the system prompt; `None` when the
    /// session is unknown or empty
    pub fn get_formatted_history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.lock().unwrap();
        let log = sessions.get(session_id)?;
        if log.is_empty() {
            return None;
        }

        let formatted = log
            .iter()
            .map(|(q, a)| format!("User: {q}\nAssistant: {a}"))
            .collect::<Vec<_>>()
            .join("\n");
        Some(formatted)
    }

    /// Drop a session's history entirely
    pub fn clear_session(&self, session_id: &str) {
        self.sessions.lock().unwrap().remove(session_id);
    }
}
