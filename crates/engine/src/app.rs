//! Application state and composition.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::{
    clock::{SystemClock, SystemRandom},
    memory::{InMemoryAuth, InMemoryCharacterStore},
    ports::{AuthError, AuthPort, CharacterStore, ClockPort, RandomPort},
    rest::{EndpointError, RestAuth, RestCharacterStore, RestEndpoint},
    settings::SyncConfig,
};
use crate::use_cases::{AuthUseCases, DiceRoller, SheetController};

/// Main application state.
///
/// Holds the login flow and the sheet controller, both wired to the same
/// auth service and record store.
pub struct App {
    pub auth: AuthUseCases,
    pub sheets: Arc<SheetController>,
    pub config: SyncConfig,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        store: Arc<dyn CharacterStore>,
        auth: Arc<dyn AuthPort>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        config: SyncConfig,
    ) -> Self {
        let sheets = Arc::new(SheetController::new(store, clock.clone(), config.debounce));
        Self {
            auth: AuthUseCases::new(auth),
            sheets,
            config,
            clock,
            random,
        }
    }

    /// In-memory store and auth; nothing leaves the process.
    pub fn in_memory(config: SyncConfig) -> Self {
        Self::new(
            Arc::new(InMemoryCharacterStore::new()),
            Arc::new(InMemoryAuth::default()),
            Arc::new(SystemClock::new()),
            Arc::new(SystemRandom::new()),
            config,
        )
    }

    /// Hosted adapters when a store URL is configured, in-memory otherwise.
    pub fn from_config(config: SyncConfig) -> Result<Self, EndpointError> {
        if config.store_url.is_none() {
            tracing::info!("No store URL configured, using in-memory adapters");
            return Ok(Self::in_memory(config));
        }

        let endpoint = RestEndpoint::from_config(&config)?;
        let auth = Arc::new(RestAuth::new(endpoint.clone()));
        let store = Arc::new(RestCharacterStore::new(
            endpoint,
            config.table.clone(),
            auth.subscribe(),
        ));
        tracing::info!(
            table = %config.table,
            debounce_ms = config.debounce.as_millis() as u64,
            "Using hosted record store"
        );
        Ok(Self::new(
            store,
            auth,
            Arc::new(SystemClock::new()),
            Arc::new(SystemRandom::new()),
            config,
        ))
    }

    /// A roller sharing the app's clock and randomness.
    pub fn dice_roller(&self) -> DiceRoller {
        DiceRoller::new(self.random.clone(), self.clock.clone())
    }

    /// Keep the sheet controller in step with the auth session until
    /// `cancel_token` fires.
    pub fn spawn_session_watcher(&self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(
            self.sheets
                .clone()
                .run_session_watcher(self.auth.subscribe(), cancel_token),
        )
    }

    /// Write any pending sheet while the session token is still valid, then
    /// sign out.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.sheets.flush().await;
        self.auth.sign_out().await
    }
}
