//! Lazily generated, memoized report artifact derived from a completed
//! diagnosis. Memoization is by result identity, not content; the cache
//! never regenerates for an identity it already holds.

use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub enum ReportCache {
    #[default]
    Empty,
    Generating {
        for_result: Uuid,
    },
    Ready {
        for_result: Uuid,
        html: String,
    },
}

/// What the caller should do after asking for a given result identity.
#[derive(Debug, Clone, PartialEq)]
pub enum EnsureOutcome {
    /// Cached artifact, returned unchanged.
    Ready(String),
    /// A generation for this identity is already running; do nothing.
    AlreadyPending,
    /// The caller owns the generation for this identity now.
    MustGenerate,
}

impl ReportCache {
    /// Never invokes anything itself; the caller runs the external
    /// generator only on [`EnsureOutcome::MustGenerate`], which is
    /// yielded at most once per identity until invalidation.
    pub fn ensure(&mut self, for_result: Uuid) -> EnsureOutcome {
        match self {
            ReportCache::Ready { for_result: id, html } if *id == for_result => {
                EnsureOutcome::Ready(html.clone())
            }
            ReportCache::Generating { for_result: id } if *id == for_result => {
                EnsureOutcome::AlreadyPending
            }
            _ => {
                *self = ReportCache::Generating { for_result };
                EnsureOutcome::MustGenerate
            }
        }
    }

    /// Stores a finished artifact. Returns `false` — and drops the
    /// artifact — when the cache no longer awaits this identity, i.e.
    /// it was invalidated while the generation was in flight.
    pub fn store(&mut self, for_result: Uuid, html: String) -> bool {
        match self {
            ReportCache::Generating { for_result: id } if *id == for_result => {
                *self = ReportCache::Ready { for_result, html };
                true
            }
            _ => {
                debug!(%for_result, "discarding stale report artifact");
                false
            }
        }
    }

    /// Called whenever the diagnosis result is cleared or replaced
    /// (new submission, reset, view switch).
    pub fn invalidate(&mut self) {
        *self = ReportCache::Empty;
    }

    pub fn is_generating(&self) -> bool {
        matches!(self, ReportCache::Generating { .. })
    }
}
