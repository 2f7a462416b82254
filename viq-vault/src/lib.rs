//! viq-vault library interface
//!
//! Vault creation workflow engine, its external-service clients and the HTTP
//! surface. Exposed as a library for integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;
use viq_common::events::EventBus;

use crate::models::Session;
use crate::services::{AssetDirectory, LedgerWriter, VerificationService};
use crate::workflow::{VaultEvent, WorkflowEngine};

/// Sessions untouched for this many minutes are dropped (never while busy)
pub const SESSION_IDLE_TTL_MINUTES: i64 = 30;

/// External collaborators shared by every session
#[derive(Clone)]
pub struct Collaborators {
    pub verification: Arc<dyn VerificationService>,
    pub ledger: Arc<dyn LedgerWriter>,
    pub directory: Arc<dyn AssetDirectory>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus<VaultEvent>,
    /// Open vault creation sessions, isolated from each other
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<WorkflowEngine>>>>,
    pub verification: Arc<dyn VerificationService>,
    pub ledger: Arc<dyn LedgerWriter>,
    pub directory: Arc<dyn AssetDirectory>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
    /// Idle time after which a session is evicted
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus<VaultEvent>, collaborators: Collaborators) -> Self {
        Self {
            db,
            event_bus,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            verification: collaborators.verification,
            ledger: collaborators.ledger,
            directory: collaborators.directory,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            session_ttl: Duration::minutes(SESSION_IDLE_TTL_MINUTES),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Workflow engine for a new session, wired to the shared collaborators
    pub fn new_engine(&self) -> WorkflowEngine {
        WorkflowEngine::new(
            Arc::clone(&self.verification),
            Arc::clone(&self.ledger),
            Arc::clone(&self.directory),
        )
        .with_events(self.event_bus.clone())
    }

    /// Drop sessions idle for longer than `session_ttl`
    ///
    /// Returns the number of sessions evicted.
    pub async fn evict_idle_sessions(&self) -> usize {
        let cutoff = Utc::now() - self.session_ttl;
        let mut sessions = self.sessions.write().await;

        let mut idle = Vec::new();
        for (session_id, engine) in sessions.iter() {
            if matches!(engine.idle_since().await, Some(at) if at <= cutoff) {
                idle.push(*session_id);
            }
        }
        for session_id in &idle {
            sessions.remove(session_id);
            info!(session_id = %session_id, "Idle vault creation session evicted");
        }

        idle.len()
    }

    /// Remember a recorded verification/mint failure for `/health`
    pub async fn record_failure(&self, session: &Session, error_key: &str) {
        if let Some(message) = session.field_errors.get(error_key) {
            *self.last_error.write().await =
                Some(format!("session {}: {}", session.session_id, message));
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::session_routes())
        .merge(api::asset_routes())
        .route("/vaults/events", get(api::vault_event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
