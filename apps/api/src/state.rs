use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::auth::accounts::{AccountDirectory, PgAccountDirectory};
use crate::auth::session::{SessionKeys, SessionRegistry};
use crate::config::Config;
use crate::jobs::matching::{CandidateMatcher, KeywordMatcher};
use crate::notifications::mailer::{Mailer, RelayMailer, SimulatedMailer};
use crate::notifications::store::NotificationStore;
use crate::screening::registry::ScreeningRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub session_keys: SessionKeys,
    /// Resolves token subjects to active employees on every request.
    pub accounts: Arc<dyn AccountDirectory>,
    /// Logged-out session ids.
    pub sessions: SessionRegistry,
    pub notifications: NotificationStore,
    /// Simulated by default; relays to MAIL_RELAY_URL when configured.
    pub mailer: Arc<dyn Mailer>,
    pub screenings: ScreeningRegistry,
    /// Pluggable candidate matcher. Default: KeywordMatcher.
    pub matcher: Arc<dyn CandidateMatcher>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let email_delay = Duration::from_millis(config.email_delay_ms);
        let mailer: Arc<dyn Mailer> = match &config.mail_relay_url {
            Some(url) => Arc::new(RelayMailer::new(url.clone(), email_delay)),
            None => Arc::new(SimulatedMailer { delay: email_delay }),
        };

        Self {
            session_keys: SessionKeys::new(&config.jwt_secret, config.session_ttl_minutes),
            accounts: Arc::new(PgAccountDirectory::new(db.clone())),
            sessions: SessionRegistry::default(),
            notifications: NotificationStore::default(),
            mailer,
            screenings: ScreeningRegistry::new(Duration::from_millis(
                config.screening_connect_delay_ms,
            )),
            matcher: Arc::new(KeywordMatcher),
            db,
            config,
        }
    }
}
