//! Shared runtime state for sko-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself. Sessions live in an in-memory map keyed by the
//! token handed out at login — one entry per authenticated client,
//! dropped on logout or process exit. There is no global "logged in"
//! flag anywhere.

use std::collections::HashMap;
use std::sync::Arc;

use sko_pantry::{PantryService, Session};
use tokio::sync::RwLock;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: PantryService,
    pub build: BuildInfo,
    /// Active sessions keyed by the opaque token returned from login.
    pub sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl AppState {
    pub fn new(service: PantryService) -> Self {
        Self {
            service,
            build: BuildInfo {
                service: "sko-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a freshly minted session and return its token.
    pub async fn insert_session(&self, session: Session) -> Uuid {
        let token = Uuid::new_v4();
        self.sessions.write().await.insert(token, session);
        token
    }

    /// Resolve a token back to its session, if one is active.
    pub async fn session_for(&self, token: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&token).cloned()
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
