use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::screening::session::{ScreeningEvent, ScreeningSession, MAX_SCORE, MIN_SCORE};

/// In-memory screening sessions. Lost on restart.
#[derive(Clone)]
pub struct ScreeningRegistry {
    inner: Arc<RwLock<HashMap<Uuid, ScreeningSession>>>,
    connect_delay: Duration,
}

impl ScreeningRegistry {
    pub fn new(connect_delay: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            connect_delay,
        }
    }

    pub async fn create(&self, candidate_id: Uuid, job_id: Option<Uuid>, host_id: Uuid) -> ScreeningSession {
        let session = ScreeningSession::new(candidate_id, job_id, host_id);
        self.inner.write().await.insert(session.id, session.clone());
        session
    }

    pub async fn get(&self, id: Uuid) -> Result<ScreeningSession, AppError> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Screening", id))
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<ScreeningSession> {
        let mut sessions: Vec<_> = self.inner.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    async fn update<F>(&self, id: Uuid, f: F) -> Result<ScreeningSession, AppError>
    where
        F: FnOnce(&mut ScreeningSession) -> Result<(), AppError>,
    {
        let mut inner = self.inner.write().await;
        let session = inner
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Screening", id))?;
        f(session)?;
        Ok(session.clone())
    }

    /// Moves the session to connecting and schedules the fake handshake.
    pub async fn connect(&self, id: Uuid) -> Result<ScreeningSession, AppError> {
        let session = self
            .update(id, |s| s.apply(ScreeningEvent::Connect))
            .await?;

        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(registry.connect_delay).await;
            // The call may have been ended while connecting.
            match registry
                .update(id, |s| s.apply(ScreeningEvent::Established))
                .await
            {
                Ok(_) => info!("Screening {id} connected"),
                Err(e) => debug!("Screening {id} not connected: {e}"),
            }
        });

        Ok(session)
    }

    pub async fn signal(&self, id: Uuid, kind: &str, payload: &serde_json::Value) -> Result<ScreeningSession, AppError> {
        let session = self.update(id, |s| s.accept_signal()).await?;
        debug!("Screening {id}: discarded {kind} signal ({} bytes)", payload.to_string().len());
        Ok(session)
    }

    pub async fn set_recording(&self, id: Uuid, on: bool) -> Result<ScreeningSession, AppError> {
        self.update(id, |s| s.set_recording(on)).await
    }

    pub async fn end(&self, id: Uuid) -> Result<ScreeningSession, AppError> {
        let score = rand::thread_rng().gen_range(MIN_SCORE..=MAX_SCORE);
        self.update(id, |s| s.end(score)).await
    }
}
