//! Host-side collaborators: notifications, element lookup, interval timers.

use serde::{Deserialize, Serialize};

use crate::clock::TimerElement;
use crate::error::PlayerError;
use crate::reveal::RevealPlan;

/// Transport notifications delivered to the embedding context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackEvent {
    Started,
    Paused,
    Stopped,
}

impl PlaybackEvent {
    /// Message name used when forwarding to a page.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started => "playbackStarted",
            Self::Paused => "playbackPaused",
            Self::Stopped => "playbackStopped",
        }
    }
}

/// Observer registered by the embedding context. Delivery is one-way and best-effort.
pub trait PlaybackHost {
    fn notify(&mut self, event: PlaybackEvent) -> Result<(), PlayerError>;

    /// Fade in the host's reveal targets following `plan`.
    fn reveal(&mut self, _plan: &RevealPlan) {}
}

/// Resolves element identifiers to host elements.
pub trait ElementResolver {
    fn resolve_timer(&mut self, id: &str) -> Option<Box<dyn TimerElement>>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct IntervalHandle(pub u32);

/// Recurring timer service (`setInterval`/`clearInterval` in a browser).
///
/// The host calls back into the owner on every period; the scheduler only tracks
/// lifetimes.
pub trait IntervalScheduler {
    fn start(&mut self, period_ms: f64) -> IntervalHandle;
    fn cancel(&mut self, handle: IntervalHandle);
}
