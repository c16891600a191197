//! One-shot auto-play armed on the timer element's visibility.
//!
//! Detection (an `IntersectionObserver` in a browser) lives outside the core; the
//! detector feeds visible ratios in and the trigger decides when to play.

use crate::config::AutoPlayConfig;

#[derive(Clone, Copy, Debug, PartialEq)]
enum TriggerState {
    Inert,
    Armed,
    Pending { remaining_ms: f64 },
    Spent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerAction {
    /// Below threshold, or not armed.
    Ignored,
    /// Threshold reached; play now. The trigger is spent.
    PlayNow,
    /// Threshold reached; play once the extra delay elapses.
    Scheduled,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisibilityTrigger {
    threshold: f64,
    extra_delay_ms: f64,
    state: TriggerState,
}

impl VisibilityTrigger {
    /// A trigger that never fires until armed.
    pub fn inert() -> Self {
        Self {
            threshold: 1.0,
            extra_delay_ms: 0.0,
            state: TriggerState::Inert,
        }
    }

    pub fn armed(cfg: &AutoPlayConfig) -> Self {
        let mut t = Self::inert();
        t.arm(cfg);
        t
    }

    /// Arm (or re-configure) the trigger. Returns `false` once it has fired.
    pub fn arm(&mut self, cfg: &AutoPlayConfig) -> bool {
        if self.is_spent() {
            return false;
        }
        self.threshold = cfg.threshold;
        self.extra_delay_ms = cfg.extra_delay_ms.max(0.0);
        self.state = TriggerState::Armed;
        true
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        matches!(self.state, TriggerState::Armed)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, TriggerState::Pending { .. })
    }

    #[inline]
    pub fn is_spent(&self) -> bool {
        matches!(self.state, TriggerState::Spent)
    }

    /// Feed the currently visible fraction of the timer element.
    pub fn observe(&mut self, ratio: f64) -> TriggerAction {
        if !self.is_armed() || !(ratio >= self.threshold - 1e-9) {
            return TriggerAction::Ignored;
        }
        if self.extra_delay_ms > 0.0 {
            self.state = TriggerState::Pending {
                remaining_ms: self.extra_delay_ms,
            };
            TriggerAction::Scheduled
        } else {
            self.state = TriggerState::Spent;
            TriggerAction::PlayNow
        }
    }

    /// Count down a pending trigger. Returns `true` when it is due.
    pub fn advance(&mut self, dt_ms: f64) -> bool {
        if let TriggerState::Pending { remaining_ms } = self.state {
            let left = remaining_ms - dt_ms.max(0.0);
            if left <= 0.0 {
                self.state = TriggerState::Spent;
                return true;
            }
            self.state = TriggerState::Pending { remaining_ms: left };
        }
        false
    }
}

impl Default for VisibilityTrigger {
    fn default() -> Self {
        Self::inert()
    }
}
