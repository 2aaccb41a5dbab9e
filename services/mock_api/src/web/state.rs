//! services/mock_api/src/web/state.rs
//!
//! Defines the application state shared by every handler.

use crate::adapters::InMemoryStore;
use crate::config::Config;
use crate::web::sequencer_task::Sequencer;
use quiz_pipeline_core::generator::MockContentGenerator;
use quiz_pipeline_core::ports::SessionStore;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub config: Arc<Config>,
    pub sequencer: Sequencer,
    pub generator: MockContentGenerator,
}

impl AppState {
    /// Builds the state around an explicit store.
    pub fn new(config: Config, store: Arc<dyn SessionStore>) -> Self {
        Self {
            sequencer: Sequencer::new(store.clone()),
            generator: MockContentGenerator::new(config.questions_per_topic),
            config: Arc::new(config),
            store,
        }
    }

    /// Builds the state around a fresh, empty in-memory store.
    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Arc::new(InMemoryStore::new()))
    }
}
