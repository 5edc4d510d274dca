//! Who is making a request: client address, server-side session, and the
//! authenticated principal. Populated into request extensions by the server
//! layers and read back through [`RequestIdentity`].

use crate::config::SessionConfig;
use axum::extract::ConnectInfo;
use dashmap::DashMap;
use moka::sync::Cache;
use serde_json::Value;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Authenticated caller identity established by an upstream auth layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Server-side session shared by every request carrying the same cookie.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    attributes: DashMap<String, Value>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: id.into(),
                attributes: DashMap::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.inner.attributes.get(name).map(|v| v.value().clone())
    }

    /// String attribute lookup. Values of any other JSON type count as absent.
    pub fn attribute_str(&self, name: &str) -> Option<String> {
        match self.inner.attributes.get(name)?.value() {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&self, name: &str) -> Option<Value> {
        self.inner.attributes.remove(name).map(|(_, v)| v)
    }
}

/// In-memory session registry keyed by session id.
///
/// Sessions expire after sitting idle for `idle_timeout`, and the store
/// never holds more than `max_sessions` entries.
pub struct SessionStore {
    sessions: Cache<String, Session>,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration, max_sessions: u64) -> Self {
        Self {
            sessions: Cache::builder()
                .time_to_idle(idle_timeout)
                .max_capacity(max_sessions)
                .build(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            Duration::from_secs(config.idle_timeout_secs),
            config.max_sessions,
        )
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id)
    }

    /// Look up `id`, or start a new session. The flag is `true` when the
    /// session was created by this call.
    pub fn get_or_create(&self, id: Option<&str>) -> (Session, bool) {
        if let Some(session) = id.and_then(|id| self.get(id)) {
            return (session, false);
        }
        let session = Session::new(uuid::Uuid::new_v4().to_string());
        self.sessions
            .insert(session.id().to_string(), session.clone());
        tracing::debug!(session_id = %session.id(), "Session created");
        (session, true)
    }

    pub fn invalidate(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Live session count, after applying pending expirations.
    pub fn len(&self) -> usize {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("entries", &self.sessions.entry_count())
            .finish()
    }
}

/// Read-only view of the identity attached to an inbound request.
pub trait RequestIdentity {
    /// Peer IP address, without the port.
    fn remote_addr(&self) -> Option<String>;
    fn session(&self) -> Option<Session>;
    fn principal(&self) -> Option<Principal>;
}

impl<B> RequestIdentity for axum::http::Request<B> {
    fn remote_addr(&self) -> Option<String> {
        self.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    }

    fn session(&self) -> Option<Session> {
        self.extensions().get::<Session>().cloned()
    }

    fn principal(&self) -> Option<Principal> {
        self.extensions().get::<Principal>().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_str_ignores_wrong_type() {
        let session = Session::new("s1");
        session.set_attribute("username", json!(42));
        assert_eq!(session.attribute("username"), Some(json!(42)));
        assert_eq!(session.attribute_str("username"), None);

        session.set_attribute("username", "alice");
        assert_eq!(session.attribute_str("username").as_deref(), Some("alice"));

        assert_eq!(session.remove_attribute("username"), Some(json!("alice")));
        assert_eq!(session.attribute_str("username"), None);
    }

    #[test]
    fn test_session_clones_share_attributes() {
        let session = Session::new("s1");
        let other = session.clone();
        other.set_attribute("username", "bob");
        assert_eq!(session.attribute_str("username").as_deref(), Some("bob"));
    }

    #[test]
    fn test_store_get_or_create() {
        let store = SessionStore::default();
        let (first, created) = store.get_or_create(None);
        assert!(created);

        let (again, created) = store.get_or_create(Some(first.id()));
        assert!(!created);
        assert_eq!(again.id(), first.id());

        let (fresh, created) = store.get_or_create(Some("unknown"));
        assert!(created);
        assert_ne!(fresh.id(), "unknown");
        assert_eq!(store.len(), 2);

        assert!(store.invalidate(first.id()));
        assert!(!store.invalidate(first.id()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = SessionStore::new(Duration::from_millis(50), 100);
        let (session, _) = store.get_or_create(None);
        assert_eq!(store.len(), 1);

        std::thread::sleep(Duration::from_millis(150));
        assert!(store.get(session.id()).is_none());
        assert_eq!(store.len(), 0);

        let (fresh, created) = store.get_or_create(Some(session.id()));
        assert!(created);
        assert_ne!(fresh.id(), session.id());
    }

    #[test]
    fn test_active_session_stays_alive() {
        let store = SessionStore::new(Duration::from_millis(200), 100);
        let (session, _) = store.get_or_create(None);
        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(80));
            assert!(store.get(session.id()).is_some());
        }
    }

    #[test]
    fn test_store_is_bounded() {
        let store = SessionStore::new(Duration::from_secs(60), 10);
        for _ in 0..50 {
            let _ = store.get_or_create(None);
        }
        assert!(store.len() <= 10, "len = {}", store.len());
    }

    #[test]
    fn test_request_identity_from_extensions() {
        let mut request = axum::http::Request::new(());
        assert_eq!(request.remote_addr(), None);
        assert!(request.session().is_none());
        assert!(request.principal().is_none());

        let addr: SocketAddr = "192.168.1.7:53211".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request.extensions_mut().insert(Principal::new("carol"));
        request.extensions_mut().insert(Session::new("s9"));

        assert_eq!(request.remote_addr().as_deref(), Some("192.168.1.7"));
        assert_eq!(request.principal(), Some(Principal::new("carol")));
        assert_eq!(request.session().map(|s| s.id().to_string()).as_deref(), Some("s9"));
    }
}
