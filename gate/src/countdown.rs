use chrono::{DateTime, Duration, Utc};

/// Time left on the active code, computed locally from its `expires_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    expires_at: DateTime<Utc>,
}

impl Countdown {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self { expires_at }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `None` once `now` is past expiry.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let left = self.expires_at - now;
        (left >= Duration::zero()).then_some(left)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now).is_none()
    }

    /// `m:ss`, or `EXPIRED`. Partial seconds are truncated.
    pub fn label(&self, now: DateTime<Utc>) -> String {
        match self.remaining(now) {
            Some(left) => {
                let secs = left.num_seconds();
                format!("{}:{:02}", secs / 60, secs % 60)
            }
            None => "EXPIRED".to_string(),
        }
    }
}
