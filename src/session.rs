//! Session manager (spec §1, §6): session lifecycle, authentication, and
//! HTTP/admin handlers are external collaborators the spec only asks us to
//! interface with — this module carries just enough of that interface for
//! [`crate::service`] to authenticate a caller, bind them to a space and
//! role, and look the binding back up on every `execute` call.
//!
//! Grounded in the teacher's `SessionManager` (`src/session.rs`): a
//! `parking_lot`-guarded session table keyed by a cryptographic id, an idle
//! timeout reaper, and a bounded audit log of lifecycle events. The
//! ephemeral-fact/rule bookkeeping the teacher layers on top of that table
//! belongs to a different domain and is dropped; what's kept is the shape
//! around it — create/touch/reap/close, one audit event per transition.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Instant;

use crate::auth::Role;
use crate::error::{Error, Result};

pub type SessionId = String;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum number of concurrent sessions (0 = unlimited).
    pub max_sessions: usize,
    /// Idle timeout in seconds before a session is reaped (0 = no timeout).
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig { max_sessions: 10_000, idle_timeout_secs: 3600 }
    }
}

/// A single authenticated session: the space it's bound to, the role it
/// authenticates as, and the timestamps `reap_expired` checks against.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub username: String,
    pub role: Role,
    pub space: String,
    pub created_at: Instant,
    pub last_accessed: Instant,
}

impl Session {
    fn new(id: SessionId, username: String, role: Role, space: String) -> Self {
        let now = Instant::now();
        Session { id, username, role, space, created_at: now, last_accessed: now }
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

#[derive(Debug, Clone)]
pub enum AuditEvent {
    SessionCreated { session_id: SessionId, username: String, space: String },
    SessionClosed { session_id: SessionId },
    SessionsReaped { count: usize },
}

/// Bounded event buffer; oldest half is dropped once full, mirroring the
/// teacher's `AuditLog`.
pub struct AuditLog {
    events: RwLock<Vec<AuditEvent>>,
    max_events: usize,
}

impl AuditLog {
    pub fn new(max_events: usize) -> Self {
        AuditLog { events: RwLock::new(Vec::new()), max_events }
    }

    fn record(&self, event: AuditEvent) {
        if self.max_events == 0 {
            self.events.write().push(event);
            return;
        }
        let mut events = self.events.write();
        if events.len() >= self.max_events {
            let drain_count = (self.max_events / 2).max(1);
            events.drain(..drain_count);
        }
        events.push(event);
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        AuditLog::new(10_000)
    }
}

/// Thread-safe table of active sessions (spec §5 "shared resources").
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Session>>,
    config: SessionConfig,
    audit: AuditLog,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        SessionManager { sessions: RwLock::new(HashMap::new()), config, audit: AuditLog::default() }
    }

    /// Register an authenticated caller as a new session bound to `space`.
    pub fn create_session(&self, username: &str, role: Role, space: &str) -> Result<SessionId> {
        let mut sessions = self.sessions.write();
        if self.config.max_sessions > 0 && sessions.len() >= self.config.max_sessions {
            return Err(Error::Execution { message: format!("maximum number of sessions ({}) exceeded", self.config.max_sessions) });
        }
        let id = uuid::Uuid::new_v4().to_string();
        sessions.insert(id.clone(), Session::new(id.clone(), username.to_string(), role, space.to_string()));
        drop(sessions);
        self.audit.record(AuditEvent::SessionCreated { session_id: id.clone(), username: username.to_string(), space: space.to_string() });
        Ok(id)
    }

    pub fn close_session(&self, id: &SessionId) -> Result<()> {
        self.sessions.write().remove(id).ok_or_else(|| Error::Execution { message: format!("session {id} not found") })?;
        self.audit.record(AuditEvent::SessionClosed { session_id: id.clone() });
        Ok(())
    }

    pub fn has_session(&self, id: &SessionId) -> bool {
        self.sessions.read().contains_key(id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Look up a session's bound space/role and refresh its idle clock —
    /// the read path `execute()` takes on every call (spec §6 "touch
    /// session on genuine activity").
    pub fn touch(&self, id: &SessionId) -> Result<Session> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(id).ok_or_else(|| Error::Execution { message: format!("session {id} not found") })?;
        session.touch();
        Ok(session.clone())
    }

    /// Reap sessions idle past the configured timeout. Returns the count reaped.
    pub fn reap_expired(&self) -> usize {
        if self.config.idle_timeout_secs == 0 {
            return 0;
        }
        let timeout = std::time::Duration::from_secs(self.config.idle_timeout_secs);
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| now.duration_since(session.last_accessed) < timeout);
        let reaped = before - sessions.len();
        drop(sessions);
        if reaped > 0 {
            self.audit.record(AuditEvent::SessionsReaped { count: reaped });
        }
        reaped
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        SessionManager::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_touch_round_trips_the_bound_space_and_role() {
        let mgr = SessionManager::default();
        let id = mgr.create_session("ada", Role::User, "sg").unwrap();
        let session = mgr.touch(&id).unwrap();
        assert_eq!(session.space, "sg");
        assert_eq!(session.role, Role::User);
    }

    #[test]
    fn close_then_touch_is_an_error() {
        let mgr = SessionManager::default();
        let id = mgr.create_session("ada", Role::User, "sg").unwrap();
        mgr.close_session(&id).unwrap();
        assert!(mgr.touch(&id).is_err());
    }

    #[test]
    fn max_sessions_is_enforced() {
        let mgr = SessionManager::new(SessionConfig { max_sessions: 1, idle_timeout_secs: 0 });
        mgr.create_session("a", Role::User, "sg").unwrap();
        assert!(mgr.create_session("b", Role::User, "sg").is_err());
    }

    #[test]
    fn reap_with_zero_timeout_is_a_no_op() {
        let mgr = SessionManager::new(SessionConfig { max_sessions: 0, idle_timeout_secs: 0 });
        mgr.create_session("a", Role::User, "sg").unwrap();
        assert_eq!(mgr.reap_expired(), 0);
    }

    #[test]
    fn audit_log_records_create_and_close() {
        let mgr = SessionManager::default();
        let id = mgr.create_session("ada", Role::User, "sg").unwrap();
        mgr.close_session(&id).unwrap();
        assert_eq!(mgr.audit_log().len(), 2);
        let events = mgr.audit_log().events();
        assert!(matches!(events[0], AuditEvent::SessionCreated { .. }));
        assert!(matches!(events[1], AuditEvent::SessionClosed { .. }));
    }
}
