use chrono::NaiveDateTime;

use crate::model::Transition;

/// Transition state between the live content and its successor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FadePhase {
    Idle,
    Fading {
        next: String,
        started: NaiveDateTime,
        fade_ms: u32,
    },
}

/// What the controller decided about a proposal; the owner acts on it
/// (switching contents, building the incoming strip).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Already live, or a fade is in flight (no re-targeting mid-fade).
    Ignored,
    /// Switch immediately.
    Cut,
    /// A fade toward the proposal has begun.
    FadeStarted,
}

/// Two-state machine coordinating cut/crossfade transitions.
///
/// While `Fading`, further proposals are ignored: re-targeting mid-fade
/// would blend three contents with undefined weights.
#[derive(Clone, Debug)]
pub struct CrossfadeController {
    phase: FadePhase,
}

impl Default for CrossfadeController {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossfadeController {
    pub fn new() -> Self {
        Self {
            phase: FadePhase::Idle,
        }
    }

    pub fn phase(&self) -> &FadePhase {
        &self.phase
    }

    pub fn is_fading(&self) -> bool {
        matches!(self.phase, FadePhase::Fading { .. })
    }

    /// The fade target, while one is in flight.
    pub fn next(&self) -> Option<&str> {
        match &self.phase {
            FadePhase::Fading { next, .. } => Some(next),
            FadePhase::Idle => None,
        }
    }

    pub fn propose(
        &mut self,
        current: Option<&str>,
        target: &str,
        transition: Transition,
        fade_ms: u32,
        now: NaiveDateTime,
    ) -> Decision {
        if self.is_fading() || current == Some(target) {
            return Decision::Ignored;
        }
        match transition {
            Transition::Cut => Decision::Cut,
            Transition::Crossfade => {
                self.phase = FadePhase::Fading {
                    next: target.to_string(),
                    started: now,
                    fade_ms,
                };
                Decision::FadeStarted
            }
        }
    }

    /// Blend weight of the incoming content at `now`: 0 when idle,
    /// `clamp(elapsed / fade_ms, 0, 1)` while fading.
    pub fn alpha(&self, now: NaiveDateTime) -> f32 {
        match &self.phase {
            FadePhase::Idle => 0.0,
            FadePhase::Fading {
                started, fade_ms, ..
            } => {
                let elapsed = (now - *started).num_milliseconds() as f64;
                let duration = f64::from((*fade_ms).max(1));
                (elapsed / duration).clamp(0.0, 1.0) as f32
            }
        }
    }

    /// Finish the fade once the configured duration has elapsed, returning
    /// the content to promote. Returns `Some` exactly once per fade.
    pub fn settle(&mut self, now: NaiveDateTime) -> Option<String> {
        if let FadePhase::Fading {
            next,
            started,
            fade_ms,
        } = &self.phase
        {
            let elapsed = (now - *started).num_milliseconds();
            if elapsed >= i64::from(*fade_ms) {
                let promoted = next.clone();
                self.phase = FadePhase::Idle;
                return Some(promoted);
            }
        }
        None
    }

    /// Abandon any in-flight fade (manual overrides, content deletion).
    pub fn cancel(&mut self) {
        self.phase = FadePhase::Idle;
    }

    /// Follow a registry rename while a fade toward `from` is in flight.
    pub fn rename_next(&mut self, from: &str, to: &str) {
        if let FadePhase::Fading { next, .. } = &mut self.phase
            && next == from
        {
            *next = to.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(ms: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 3)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + chrono::Duration::milliseconds(ms)
    }

    #[test]
    fn cut_switches_without_entering_fading() {
        let mut ctl = CrossfadeController::new();
        let d = ctl.propose(Some("a"), "b", Transition::Cut, 800, at(0));
        assert_eq!(d, Decision::Cut);
        assert!(!ctl.is_fading());
    }

    #[test]
    fn same_target_is_ignored() {
        let mut ctl = CrossfadeController::new();
        let d = ctl.propose(Some("a"), "a", Transition::Crossfade, 800, at(0));
        assert_eq!(d, Decision::Ignored);
    }

    #[test]
    fn alpha_is_monotone_and_saturates() {
        let mut ctl = CrossfadeController::new();
        ctl.propose(Some("a"), "b", Transition::Crossfade, 800, at(0));
        let mut last = -1.0f32;
        for ms in [0i64, 100, 200, 400, 799, 800, 1000] {
            let a = ctl.alpha(at(ms));
            assert!(a >= last, "alpha regressed at {ms}ms");
            last = a;
        }
        assert_eq!(ctl.alpha(at(800)), 1.0);
        assert_eq!(ctl.alpha(at(5000)), 1.0);
    }

    #[test]
    fn settles_exactly_once() {
        let mut ctl = CrossfadeController::new();
        ctl.propose(Some("a"), "b", Transition::Crossfade, 800, at(0));
        assert_eq!(ctl.settle(at(400)), None);
        assert_eq!(ctl.settle(at(800)), Some("b".to_string()));
        assert!(!ctl.is_fading());
        assert_eq!(ctl.settle(at(900)), None);
    }

    #[test]
    fn proposals_are_ignored_mid_fade() {
        let mut ctl = CrossfadeController::new();
        ctl.propose(Some("a"), "b", Transition::Crossfade, 800, at(0));
        let d = ctl.propose(Some("a"), "c", Transition::Crossfade, 800, at(100));
        assert_eq!(d, Decision::Ignored);
        assert_eq!(ctl.next(), Some("b"));
        // Even a cut proposal does not re-target.
        let d = ctl.propose(Some("a"), "c", Transition::Cut, 0, at(200));
        assert_eq!(d, Decision::Ignored);
    }

    #[test]
    fn zero_duration_fade_settles_immediately() {
        let mut ctl = CrossfadeController::new();
        ctl.propose(Some("a"), "b", Transition::Crossfade, 0, at(0));
        assert_eq!(ctl.alpha(at(0)), 0.0);
        assert_eq!(ctl.settle(at(0)), Some("b".to_string()));
    }

    #[test]
    fn cancel_clears_fade_state() {
        let mut ctl = CrossfadeController::new();
        ctl.propose(Some("a"), "b", Transition::Crossfade, 800, at(0));
        ctl.cancel();
        assert!(!ctl.is_fading());
        assert_eq!(ctl.settle(at(1000)), None);
    }
}
