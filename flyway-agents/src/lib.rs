//! Flyway Agents - Encounter and Conversation Pipeline
//!
//! Everything that makes birds meet and talk:
//! - Affinity scoring between two birds
//! - Encounter scanning (full sweep and one-vs-all)
//! - The conversation driver and its dispatch queue
//! - Relationship reinforcement
//! - Bird assignment, species switch and history reads

pub mod affinity;
pub mod birds;
pub mod chance;
pub mod conversation;
pub mod credentials;
pub mod dispatch;
pub mod history;
pub mod relationship;
pub mod scanner;

pub use affinity::{
    score, should_trigger_conversation, AffinityBreakdown, AffinityProfile, AffinityScore,
};
pub use birds::{assign_species, BirdService, SpeciesSwitch};
pub use chance::{Chance, FixedChance, SeededChance, ThreadChance};
pub use conversation::{ConversationContext, ConversationDriver, ConversationOutcome};
pub use credentials::CredentialManager;
pub use dispatch::{
    spawn_dispatcher, ConversationInbox, ConversationJob, ConversationQueue, DispatchMetrics,
    DispatchMetricsSnapshot,
};
pub use history::{conversation_detail, encounter_history, EncounterRecord, Transcript};
pub use relationship::{reinforce_pair, remove_pair};
pub use scanner::{EncounterScanner, EncounterSummary, SweepReport};

use flyway_core::{FlywayConfig, FlywayResult};
use flyway_llm::{GenerationService, TokenRefresher};
use flyway_storage::RecordStore;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The wired-up pipeline: scanner, driver and bird service sharing one
/// store, one generation service and one conversation queue.
pub struct Pipeline {
    pub store: Arc<dyn RecordStore>,
    pub scanner: Arc<EncounterScanner>,
    pub driver: Arc<ConversationDriver>,
    pub birds: Arc<BirdService>,
    pub metrics: Arc<DispatchMetrics>,
    inbox: Option<ConversationInbox>,
}

impl Pipeline {
    /// Build the pipeline. `config` is validated first.
    pub fn new(
        store: Arc<dyn RecordStore>,
        generation: Arc<dyn GenerationService>,
        refresher: Arc<dyn TokenRefresher>,
        config: FlywayConfig,
        chance: Arc<dyn Chance>,
    ) -> FlywayResult<Self> {
        config.validate()?;
        let credentials = CredentialManager::new(
            store.clone(),
            refresher,
            config.token_refresh_leeway_chrono(),
        );
        let (queue, inbox) = ConversationQueue::channel();

        let driver = ConversationDriver::new(
            store.clone(),
            generation.clone(),
            credentials.clone(),
            config.clone(),
            chance.clone(),
        );
        let scanner = EncounterScanner::new(
            store.clone(),
            generation.clone(),
            credentials.clone(),
            queue,
            config,
            chance.clone(),
        );
        let birds = BirdService::new(store.clone(), generation, credentials, chance);

        Ok(Self {
            store,
            scanner: Arc::new(scanner),
            driver: Arc::new(driver),
            birds: Arc::new(birds),
            metrics: Arc::new(DispatchMetrics::default()),
            inbox: Some(inbox),
        })
    }

    /// Start the conversation dispatcher. Returns `None` if already started.
    pub fn start_dispatcher(&mut self) -> Option<JoinHandle<()>> {
        let inbox = self.inbox.take()?;
        Some(spawn_dispatcher(
            self.driver.clone(),
            inbox,
            self.metrics.clone(),
        ))
    }

    /// Hand the queue's receiving end to the caller instead of the dispatcher.
    pub fn take_inbox(&mut self) -> Option<ConversationInbox> {
        self.inbox.take()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("dispatcher_started", &self.inbox.is_none())
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}
