//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use tutoring_core::{
    BillingLedger, LifecycleConfig, NotificationService, ReviewLog, Roster, SessionManager,
    SessionStore, TabularStore,
};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionManager,
    pub roster: Roster,
    pub reviews: ReviewLog,
    pub ledger: BillingLedger,
}

impl AppState {
    /// Wires every service over one store and one mailer.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn TabularStore>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        let roster = Roster::new(store.clone());
        let reviews = ReviewLog::new(store.clone());
        let sessions = SessionManager::new(
            SessionStore::new(store.clone()),
            roster.clone(),
            reviews.clone(),
            notifier,
            LifecycleConfig {
                base_url: config.base_url.clone(),
            },
        );
        let ledger = BillingLedger::new(store, reviews.clone(), roster.clone());
        Self {
            config,
            sessions,
            roster,
            reviews,
            ledger,
        }
    }
}
