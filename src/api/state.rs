//! Application state for the attendance API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::calendar::CalendarMaterializer;
use crate::compliance::ComplianceService;
use crate::config::EngineConfig;
use crate::store::EngineStore;

/// Shared application state.
///
/// Holds the materializer and compliance service, both backed by the same
/// store.
#[derive(Clone)]
pub struct AppState {
    materializer: Arc<CalendarMaterializer<dyn EngineStore>>,
    compliance: Arc<ComplianceService<dyn EngineStore>>,
}

impl AppState {
    /// Creates the application state over `store` with the given configuration.
    pub fn new(store: Arc<dyn EngineStore>, config: EngineConfig) -> Self {
        let materializer = Arc::new(CalendarMaterializer::new(store.clone(), Arc::new(config)));
        let compliance = Arc::new(ComplianceService::new(store, materializer.clone()));
        Self {
            materializer,
            compliance,
        }
    }

    /// Returns the calendar materializer.
    pub fn materializer(&self) -> &CalendarMaterializer<dyn EngineStore> {
        &self.materializer
    }

    /// Returns the compliance service.
    pub fn compliance(&self) -> &ComplianceService<dyn EngineStore> {
        &self.compliance
    }
}
