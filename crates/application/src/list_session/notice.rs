use std::time::{Duration, Instant};

/// How long a notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Tone of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The operation succeeded.
    Success,
    /// The operation failed or only partly succeeded.
    Error,
}

impl NoticeKind {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Transient, dismissible status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    kind: NoticeKind,
    message: String,
    expires_at: Instant,
}

impl Notice {
    pub(super) fn new(kind: NoticeKind, message: impl Into<String>, now: Instant) -> Self {
        Self {
            kind,
            message: message.into(),
            expires_at: now + NOTICE_TTL,
        }
    }

    /// Returns the notice tone.
    #[must_use]
    pub fn kind(&self) -> NoticeKind {
        self.kind
    }

    /// Returns the message text.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns whether the notice is still visible at `now`.
    #[must_use]
    pub fn is_visible_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}
