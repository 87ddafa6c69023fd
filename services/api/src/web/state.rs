//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use libre_research_core::ports::{
    DatabaseService, PasswordService, ReportRenderingService, ResearchGenerationService,
    TokenService,
};
use libre_research_core::{AuthService, ReportService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub reports: ReportService,
}

impl AppState {
    /// Wires the core services over the given adapters.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        research: Arc<dyn ResearchGenerationService>,
        renderer: Arc<dyn ReportRenderingService>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            auth: AuthService::new(db.clone(), passwords, tokens),
            reports: ReportService::new(db, research, renderer),
        }
    }
}
