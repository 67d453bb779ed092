//! Application state shared across API handlers

use chrono::{DateTime, Utc};
use std::sync::Arc;
use whitelist_core::WhitelistService;

/// Source of "now" for status queries and announcements
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service: WhitelistService,
    clock: Clock,
}

impl AppState {
    /// State reading the system clock
    pub fn new(service: WhitelistService) -> Self {
        Self::with_clock(service, Arc::new(Utc::now))
    }

    /// State with a fixed or simulated clock
    pub fn with_clock(service: WhitelistService, clock: Clock) -> Self {
        Self {
            inner: Arc::new(AppStateInner { service, clock }),
        }
    }

    pub fn service(&self) -> &WhitelistService {
        &self.inner.service
    }

    /// Current time as seen by the handlers
    pub fn now(&self) -> DateTime<Utc> {
        (self.inner.clock)()
    }
}
