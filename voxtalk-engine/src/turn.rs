use std::time::Duration;

use voxtalk_core::session::TurnStatus;

/// Per-stage wall-clock durations for a completed or partial turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnTimings {
    pub ask_ms: Option<u64>,
    pub synthesis_ms: Option<u64>,
    pub playback_ms: Option<u64>,
}

/// What a single turn ended as, for the host UI and logs.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    pub user_text: Option<String>,
    pub answer: Option<String>,
    pub error: Option<String>,
    pub cancelled: bool,
    pub timings: TurnTimings,
}

impl TurnOutcome {
    pub fn completed(user_text: String, answer: String, timings: TurnTimings) -> Self {
        Self {
            status: TurnStatus::Idle,
            user_text: Some(user_text),
            answer: Some(answer),
            error: None,
            cancelled: false,
            timings,
        }
    }

    pub fn failed(user_text: Option<String>, error: String, timings: TurnTimings) -> Self {
        Self {
            status: TurnStatus::Idle,
            user_text,
            answer: None,
            error: Some(error),
            cancelled: false,
            timings,
        }
    }

    pub fn cancelled(user_text: Option<String>, timings: TurnTimings) -> Self {
        Self {
            status: TurnStatus::Idle,
            user_text,
            answer: None,
            error: None,
            cancelled: true,
            timings,
        }
    }

    pub fn is_success(&self) -> bool {
        self.answer.is_some() && self.error.is_none() && !self.cancelled
    }
}

pub(crate) fn ms(d: Duration) -> u64 {
    d.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_outcome_is_success() {
        let o = TurnOutcome::completed("hi".into(), "hello".into(), TurnTimings::default());
        assert!(o.is_success());
        assert_eq!(o.status, TurnStatus::Idle);
    }

    #[test]
    fn failed_and_cancelled_are_not_success() {
        let f = TurnOutcome::failed(Some("hi".into()), "boom".into(), TurnTimings::default());
        let c = TurnOutcome::cancelled(None, TurnTimings::default());
        assert!(!f.is_success());
        assert!(!c.is_success());
    }
}
