use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{AuthError, StoreError};
use crate::models::user::{Identity, Role};
use crate::observability::metrics::Metrics;
use crate::store::persistence::Persistence;

/// A bearer token paired with the identity it resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: Uuid,
    pub identity: Identity,
}

/// Checks the demo verification code and hands out session identities.
/// Nothing is delivered anywhere; the code is a configuration constant.
pub struct SessionStore {
    verification_code: String,
    sessions: DashMap<Uuid, Identity>,
    backend: Box<dyn Persistence<AuthSession>>,
    metrics: Metrics,
}

impl SessionStore {
    pub fn open(
        verification_code: String,
        backend: Box<dyn Persistence<AuthSession>>,
        metrics: Metrics,
    ) -> Result<Self, StoreError> {
        let sessions = DashMap::new();
        for session in backend.load()? {
            sessions.insert(session.token, session.identity);
        }
        metrics.active_sessions.set(sessions.len() as i64);

        Ok(Self {
            verification_code,
            sessions,
            backend,
            metrics,
        })
    }

    /// Succeeds iff `code` equals the configured verification value. The
    /// minted identity id is unique per session and stable until logout.
    pub fn authenticate(
        &self,
        phone: &str,
        code: &str,
        name: Option<String>,
        role: Role,
    ) -> Result<AuthSession, AuthError> {
        if code != self.verification_code {
            return Err(AuthError::InvalidCode);
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            name: name.filter(|n| !n.trim().is_empty()),
            role,
        };
        let session = AuthSession {
            token: Uuid::new_v4(),
            identity,
        };

        self.sessions
            .insert(session.token, session.identity.clone());
        self.metrics.active_sessions.inc();
        self.flush();

        info!(user_id = %session.identity.id, role = ?role, "session opened");
        Ok(session)
    }

    pub fn current(&self, token: Uuid) -> Option<Identity> {
        self.sessions.get(&token).map(|entry| entry.value().clone())
    }

    /// Idempotent: ending an unknown or already-ended session is a no-op.
    pub fn end_session(&self, token: Uuid) {
        if let Some((_, identity)) = self.sessions.remove(&token) {
            self.metrics.active_sessions.dec();
            self.flush();
            info!(user_id = %identity.id, "session ended");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn flush(&self) {
        let snapshot: Vec<AuthSession> = self
            .sessions
            .iter()
            .map(|entry| AuthSession {
                token: *entry.key(),
                identity: entry.value().clone(),
            })
            .collect();

        if let Err(err) = self.backend.save(&snapshot) {
            error!(error = %err, "failed to persist session snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SessionStore;
    use crate::error::AuthError;
    use crate::models::user::Role;
    use crate::observability::metrics::Metrics;
    use crate::store::persistence::{InMemory, JsonFile};

    fn store() -> SessionStore {
        SessionStore::open("123456".to_string(), Box::new(InMemory), Metrics::new()).unwrap()
    }

    #[test]
    fn wrong_code_is_rejected() {
        let sessions = store();
        let result = sessions.authenticate("9876543210", "000000", None, Role::Customer);
        assert_eq!(result.unwrap_err(), AuthError::InvalidCode);
        assert!(sessions.is_empty());
    }

    #[test]
    fn authentication_mints_a_resolvable_session() {
        let sessions = store();

        let session = sessions
            .authenticate("9876543210", "123456", Some("Asha".to_string()), Role::Customer)
            .unwrap();

        let current = sessions.current(session.token).unwrap();
        assert_eq!(current, session.identity);
        assert_eq!(current.role, Role::Customer);
        assert_eq!(current.display_name(), "Asha");
    }

    #[test]
    fn each_session_gets_a_fresh_identity() {
        let sessions = store();

        let first = sessions
            .authenticate("9876543210", "123456", None, Role::Partner)
            .unwrap();
        let second = sessions
            .authenticate("9876543210", "123456", None, Role::Partner)
            .unwrap();

        assert_ne!(first.identity.id, second.identity.id);
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn end_session_is_idempotent() {
        let sessions = store();
        let session = sessions
            .authenticate("9876543210", "123456", None, Role::Customer)
            .unwrap();

        sessions.end_session(session.token);
        sessions.end_session(session.token);

        assert!(sessions.current(session.token).is_none());
        assert!(sessions.is_empty());
    }

    #[test]
    fn sessions_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        let first = SessionStore::open(
            "123456".to_string(),
            Box::new(JsonFile::new(path.clone())),
            Metrics::new(),
        )
        .unwrap();
        let session = first
            .authenticate("9876543210", "123456", None, Role::Partner)
            .unwrap();
        drop(first);

        let reopened = SessionStore::open(
            "123456".to_string(),
            Box::new(JsonFile::new(path)),
            Metrics::new(),
        )
        .unwrap();
        assert_eq!(reopened.current(session.token), Some(session.identity));
    }
}
