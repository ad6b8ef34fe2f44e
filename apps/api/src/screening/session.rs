//! Simulated screening call.
//!
//! ```text
//! disconnected ──connect──▶ connecting ──(delay)──▶ connected
//!                               │                      │
//!                               └────────end───────────┴──▶ ended
//! ```
//!
//! Signals (ICE candidates, SDP blobs) are accepted while connecting or
//! connected and then dropped. Recording can only be toggled while connected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

pub const MIN_SCORE: u8 = 60;
pub const MAX_SCORE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningState {
    Disconnected,
    Connecting,
    Connected,
    Ended,
}

impl ScreeningState {
    pub fn as_str(self) -> &'static str {
        match self {
            ScreeningState::Disconnected => "disconnected",
            ScreeningState::Connecting => "connecting",
            ScreeningState::Connected => "connected",
            ScreeningState::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreeningEvent {
    Connect,
    Established,
    End,
}

/// Next state for `event`, or a conflict when the move is not allowed.
pub fn transition(from: ScreeningState, event: ScreeningEvent) -> Result<ScreeningState, AppError> {
    use ScreeningEvent::*;
    use ScreeningState::*;

    match (from, event) {
        (Disconnected, Connect) => Ok(Connecting),
        (Connecting, Established) => Ok(Connected),
        (Connecting | Connected, End) => Ok(Ended),
        (state, event) => Err(AppError::Conflict(format!(
            "Cannot {} a screening that is {}",
            match event {
                Connect => "connect",
                Established => "establish",
                End => "end",
            },
            state.as_str()
        ))),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningSession {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Option<Uuid>,
    pub host_id: Uuid,
    pub state: ScreeningState,
    pub recording: bool,
    pub signals_discarded: u32,
    pub created_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub score: Option<u8>,
}

impl ScreeningSession {
    pub fn new(candidate_id: Uuid, job_id: Option<Uuid>, host_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            job_id,
            host_id,
            state: ScreeningState::Disconnected,
            recording: false,
            signals_discarded: 0,
            created_at: Utc::now(),
            connected_at: None,
            ended_at: None,
            score: None,
        }
    }

    pub fn apply(&mut self, event: ScreeningEvent) -> Result<(), AppError> {
        self.state = transition(self.state, event)?;
        match self.state {
            ScreeningState::Connected => self.connected_at = Some(Utc::now()),
            ScreeningState::Ended => {
                self.recording = false;
                self.ended_at = Some(Utc::now());
            }
            _ => {}
        }
        Ok(())
    }

    pub fn accept_signal(&mut self) -> Result<(), AppError> {
        match self.state {
            ScreeningState::Connecting | ScreeningState::Connected => {
                self.signals_discarded += 1;
                Ok(())
            }
            state => Err(AppError::Conflict(format!(
                "Cannot signal a screening that is {}",
                state.as_str()
            ))),
        }
    }

    pub fn set_recording(&mut self, on: bool) -> Result<(), AppError> {
        if self.state != ScreeningState::Connected {
            return Err(AppError::Conflict(format!(
                "Recording requires a connected screening (currently {})",
                self.state.as_str()
            )));
        }
        self.recording = on;
        Ok(())
    }

    /// Ends the call and records `score`, clamped into the screening range.
    pub fn end(&mut self, score: u8) -> Result<(), AppError> {
        self.apply(ScreeningEvent::End)?;
        self.score = Some(score.clamp(MIN_SCORE, MAX_SCORE));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ScreeningSession {
        ScreeningSession::new(Uuid::new_v4(), None, Uuid::new_v4())
    }

    #[test]
    fn test_happy_path() {
        let mut s = session();
        s.apply(ScreeningEvent::Connect).unwrap();
        assert_eq!(s.state, ScreeningState::Connecting);
        s.apply(ScreeningEvent::Established).unwrap();
        assert_eq!(s.state, ScreeningState::Connected);
        assert!(s.connected_at.is_some());
        s.set_recording(true).unwrap();
        s.end(87).unwrap();
        assert_eq!(s.state, ScreeningState::Ended);
        assert!(!s.recording);
        assert_eq!(s.score, Some(87));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(transition(ScreeningState::Disconnected, ScreeningEvent::End).is_err());
        assert!(transition(ScreeningState::Connected, ScreeningEvent::Connect).is_err());
        assert!(transition(ScreeningState::Ended, ScreeningEvent::Connect).is_err());
        assert!(transition(ScreeningState::Disconnected, ScreeningEvent::Established).is_err());
    }

    #[test]
    fn test_end_while_connecting() {
        let mut s = session();
        s.apply(ScreeningEvent::Connect).unwrap();
        s.end(70).unwrap();
        assert_eq!(s.state, ScreeningState::Ended);
        assert!(s.apply(ScreeningEvent::Established).is_err());
    }

    #[test]
    fn test_recording_requires_connected() {
        let mut s = session();
        assert!(s.set_recording(true).is_err());
        s.apply(ScreeningEvent::Connect).unwrap();
        assert!(s.set_recording(true).is_err());
    }

    #[test]
    fn test_signals_counted_only_while_live() {
        let mut s = session();
        assert!(s.accept_signal().is_err());
        s.apply(ScreeningEvent::Connect).unwrap();
        s.accept_signal().unwrap();
        s.accept_signal().unwrap();
        assert_eq!(s.signals_discarded, 2);
    }

    #[test]
    fn test_score_clamped() {
        let mut s = session();
        s.apply(ScreeningEvent::Connect).unwrap();
        s.end(20).unwrap();
        assert_eq!(s.score, Some(MIN_SCORE));
    }
}
