//! Card visibility state machine
//!
//! ```text
//! Hidden ──show──▶ FadingIn ──fade-in elapsed──▶ Visible ──auto-hide──▶ FadingOut ──▶ Hidden
//!                     ▲                              │                      │
//!                     └──────────── show (preempts any phase) ◀─────────────┘
//! ```
//!
//! All timers are deadlines stored in the current phase, so replacing the
//! phase cancels them. Time is passed in by the caller; nothing here reads a
//! clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clipqa_core::OverlayPayload;
use clipqa_types::Configuration;

pub const FADE_IN: Duration = Duration::from_millis(250);
pub const FADE_OUT: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Hidden,
    FadingIn,
    Visible,
    FadingOut,
}

/// Content and settings of one show cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub cycle: u64,
    pub payload: OverlayPayload,
    /// Configuration snapshot taken when the cycle started
    pub config: Arc<Configuration>,
}

impl Card {
    fn fade_in(&self) -> Duration {
        if self.config.behavior.animations_enabled {
            FADE_IN
        } else {
            Duration::ZERO
        }
    }

    fn fade_out(&self) -> Duration {
        if self.config.behavior.animations_enabled {
            FADE_OUT
        } else {
            Duration::ZERO
        }
    }

    /// `None` means the card stays until replaced or dismissed
    fn auto_hide(&self) -> Option<Duration> {
        match self.config.behavior.auto_hide_seconds {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub cycle: u64,
    pub from: Phase,
    pub to: Phase,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Hidden,
    FadingIn {
        started: Instant,
        until: Instant,
    },
    Visible {
        hide_at: Option<Instant>,
    },
    FadingOut {
        started: Instant,
        until: Instant,
        /// Opacity when the fade began
        from: f32,
    },
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Hidden => Phase::Hidden,
            State::FadingIn { .. } => Phase::FadingIn,
            State::Visible { .. } => Phase::Visible,
            State::FadingOut { .. } => Phase::FadingOut,
        }
    }
}

#[derive(Debug)]
pub struct Lifecycle {
    state: State,
    card: Option<Card>,
    last_cycle: u64,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: State::Hidden,
            card: None,
            last_cycle: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The live card, if any phase other than `Hidden` is active
    pub fn card(&self) -> Option<&Card> {
        self.card.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.phase(), Phase::FadingIn | Phase::FadingOut)
    }

    /// Start a new cycle with `payload`, replacing whatever is on screen.
    pub fn show(
        &mut self,
        payload: OverlayPayload,
        config: Arc<Configuration>,
        now: Instant,
    ) -> Vec<Transition> {
        self.last_cycle += 1;
        let card = Card {
            cycle: self.last_cycle,
            payload,
            config,
        };
        let from = self.phase();
        self.state = State::FadingIn {
            started: now,
            until: now + card.fade_in(),
        };
        self.card = Some(card);

        let mut transitions = vec![Transition {
            cycle: self.last_cycle,
            from,
            to: Phase::FadingIn,
        }];
        transitions.extend(self.tick(now));
        transitions
    }

    /// Begin fading out early. No effect when hidden or already fading out.
    pub fn dismiss(&mut self, now: Instant) -> Vec<Transition> {
        let Some(card) = &self.card else {
            return Vec::new();
        };
        if !matches!(self.phase(), Phase::FadingIn | Phase::Visible) {
            return Vec::new();
        }

        let from = self.phase();
        let opacity = self.opacity(now);
        let cycle = card.cycle;
        self.state = State::FadingOut {
            started: now,
            until: now + card.fade_out(),
            from: opacity,
        };

        let mut transitions = vec![Transition {
            cycle,
            from,
            to: Phase::FadingOut,
        }];
        transitions.extend(self.tick(now));
        transitions
    }

    /// Advance through every phase whose deadline has passed
    pub fn tick(&mut self, now: Instant) -> Vec<Transition> {
        let mut transitions = Vec::new();
        let Some(card) = &self.card else {
            return transitions;
        };
        let cycle = card.cycle;

        loop {
            let next = match self.state {
                State::FadingIn { until, .. } if now >= until => State::Visible {
                    hide_at: card.auto_hide().map(|d| until + d),
                },
                State::Visible {
                    hide_at: Some(at), ..
                } if now >= at => State::FadingOut {
                    started: at,
                    until: at + card.fade_out(),
                    from: 1.0,
                },
                State::FadingOut { until, .. } if now >= until => State::Hidden,
                _ => break,
            };
            transitions.push(Transition {
                cycle,
                from: self.state.phase(),
                to: next.phase(),
            });
            self.state = next;
            if matches!(next, State::Hidden) {
                break;
            }
        }

        if matches!(self.state, State::Hidden) {
            self.card = None;
        }
        transitions
    }

    /// Fade factor in `0.0..=1.0` at `now`
    pub fn opacity(&self, now: Instant) -> f32 {
        match self.state {
            State::Hidden => 0.0,
            State::FadingIn { started, until } => progress(started, until, now),
            State::Visible { .. } => 1.0,
            State::FadingOut {
                started,
                until,
                from,
            } => from * (1.0 - progress(started, until, now)),
        }
    }

    /// Earliest pending deadline, for sleeping until something changes
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            State::Hidden => None,
            State::FadingIn { until, .. } | State::FadingOut { until, .. } => Some(until),
            State::Visible { hide_at } => hide_at,
        }
    }

    /// Drop the live cycle and all its timers
    pub fn cancel(&mut self) -> Option<Transition> {
        let card = self.card.take()?;
        let from = self.phase();
        self.state = State::Hidden;
        Some(Transition {
            cycle: card.cycle,
            from,
            to: Phase::Hidden,
        })
    }
}

fn progress(started: Instant, until: Instant, now: Instant) -> f32 {
    let total = until.saturating_duration_since(started);
    if total.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(started);
    (elapsed.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(question: &str, answer: &str) -> OverlayPayload {
        OverlayPayload {
            question: question.to_string(),
            answers: vec![answer.to_string()],
        }
    }

    fn config(auto_hide_seconds: u32, animations_enabled: bool) -> Arc<Configuration> {
        let mut config = Configuration::default();
        config.behavior.auto_hide_seconds = auto_hide_seconds;
        config.behavior.animations_enabled = animations_enabled;
        Arc::new(config)
    }

    fn phases(transitions: &[Transition]) -> Vec<(Phase, Phase)> {
        transitions.iter().map(|t| (t.from, t.to)).collect()
    }

    #[test]
    fn test_full_cycle() {
        let mut lc = Lifecycle::new();
        let t0 = Instant::now();

        let t = lc.show(payload("capital of france", "Paris"), config(30, true), t0);
        assert_eq!(phases(&t), vec![(Phase::Hidden, Phase::FadingIn)]);
        assert_eq!(lc.opacity(t0), 0.0);

        let t = lc.tick(t0 + FADE_IN);
        assert_eq!(phases(&t), vec![(Phase::FadingIn, Phase::Visible)]);
        assert_eq!(lc.opacity(t0 + FADE_IN), 1.0);

        assert!(lc.tick(t0 + Duration::from_secs(29)).is_empty());

        let hide_at = t0 + FADE_IN + Duration::from_secs(30);
        let t = lc.tick(hide_at);
        assert_eq!(phases(&t), vec![(Phase::Visible, Phase::FadingOut)]);

        let t = lc.tick(hide_at + FADE_OUT);
        assert_eq!(phases(&t), vec![(Phase::FadingOut, Phase::Hidden)]);
        assert!(lc.card().is_none());
        assert_eq!(lc.next_deadline(), None);
    }

    #[test]
    fn test_fade_opacity_is_monotonic() {
        let mut lc = Lifecycle::new();
        let t0 = Instant::now();
        lc.show(payload("q", "a"), config(1, true), t0);

        let mid = lc.opacity(t0 + FADE_IN / 2);
        assert!(mid > 0.0 && mid < 1.0);

        lc.tick(t0 + FADE_IN + Duration::from_secs(1));
        let out_start = t0 + FADE_IN + Duration::from_secs(1);
        assert_eq!(lc.phase(), Phase::FadingOut);
        let early = lc.opacity(out_start + FADE_OUT / 4);
        let late = lc.opacity(out_start + FADE_OUT * 3 / 4);
        assert!(early > late);
    }

    #[test]
    fn test_preemption_keeps_single_cycle() {
        let mut lc = Lifecycle::new();
        let t0 = Instant::now();

        lc.show(payload("A", "first"), config(1, true), t0);
        lc.tick(t0 + FADE_IN);
        let fading = t0 + FADE_IN + Duration::from_secs(1);
        lc.tick(fading);
        assert_eq!(lc.phase(), Phase::FadingOut);

        let b_at = fading + FADE_OUT / 2;
        let t = lc.show(payload("B", "second"), config(30, true), b_at);
        assert_eq!(phases(&t), vec![(Phase::FadingOut, Phase::FadingIn)]);
        assert_eq!(t[0].cycle, 2);

        // A's fade-out deadline passing must not hide B
        assert!(lc.tick(fading + FADE_OUT).is_empty());
        assert_eq!(lc.phase(), Phase::FadingIn);

        let t = lc.tick(b_at + FADE_IN);
        assert_eq!(lc.phase(), Phase::Visible);
        assert_eq!(phases(&t), vec![(Phase::FadingIn, Phase::Visible)]);

        let card = lc.card().unwrap();
        assert_eq!(card.cycle, 2);
        assert_eq!(card.payload.question, "B");
    }

    #[test]
    fn test_show_while_visible_restarts_fade_in() {
        let mut lc = Lifecycle::new();
        let t0 = Instant::now();
        lc.show(payload("A", "a"), config(30, true), t0);
        lc.tick(t0 + FADE_IN);

        let t1 = t0 + Duration::from_secs(5);
        let t = lc.show(payload("B", "b"), config(30, true), t1);
        assert_eq!(phases(&t), vec![(Phase::Visible, Phase::FadingIn)]);
        assert_eq!(lc.next_deadline(), Some(t1 + FADE_IN));
    }

    #[test]
    fn test_auto_hide_zero_stays_visible() {
        let mut lc = Lifecycle::new();
        let t0 = Instant::now();
        lc.show(payload("q", "a"), config(0, true), t0);
        lc.tick(t0 + FADE_IN);

        assert!(lc.tick(t0 + Duration::from_secs(3600)).is_empty());
        assert_eq!(lc.phase(), Phase::Visible);
        assert_eq!(lc.next_deadline(), None);
    }

    #[test]
    fn test_no_animations_collapse_fades() {
        let mut lc = Lifecycle::new();
        let t0 = Instant::now();

        let t = lc.show(payload("q", "a"), config(2, false), t0);
        assert_eq!(
            phases(&t),
            vec![
                (Phase::Hidden, Phase::FadingIn),
                (Phase::FadingIn, Phase::Visible)
            ]
        );
        assert_eq!(lc.opacity(t0), 1.0);

        let t = lc.tick(t0 + Duration::from_secs(2));
        assert_eq!(
            phases(&t),
            vec![
                (Phase::Visible, Phase::FadingOut),
                (Phase::FadingOut, Phase::Hidden)
            ]
        );
    }

    #[test]
    fn test_dismiss() {
        let mut lc = Lifecycle::new();
        let t0 = Instant::now();
        assert!(lc.dismiss(t0).is_empty());

        lc.show(payload("q", "a"), config(0, true), t0);
        lc.tick(t0 + FADE_IN);

        let t1 = t0 + Duration::from_secs(3);
        let t = lc.dismiss(t1);
        assert_eq!(phases(&t), vec![(Phase::Visible, Phase::FadingOut)]);
        // Second dismissal while fading out is ignored
        assert!(lc.dismiss(t1 + FADE_OUT / 2).is_empty());

        lc.tick(t1 + FADE_OUT);
        assert_eq!(lc.phase(), Phase::Hidden);
    }

    #[test]
    fn test_dismiss_mid_fade_in_starts_from_current_opacity() {
        let mut lc = Lifecycle::new();
        let t0 = Instant::now();
        lc.show(payload("q", "a"), config(30, true), t0);

        let half = t0 + FADE_IN / 2;
        let before = lc.opacity(half);
        lc.dismiss(half);
        assert_eq!(lc.phase(), Phase::FadingOut);
        assert!((lc.opacity(half) - before).abs() < 1e-6);
    }

    #[test]
    fn test_config_snapshot_is_per_cycle() {
        let mut lc = Lifecycle::new();
        let t0 = Instant::now();
        let first = config(30, true);
        lc.show(payload("q", "a"), Arc::clone(&first), t0);

        // A later configuration does not touch the live card
        let _newer = config(5, false);
        assert!(Arc::ptr_eq(&lc.card().unwrap().config, &first));
    }

    #[test]
    fn test_cancel_clears_timers() {
        let mut lc = Lifecycle::new();
        let t0 = Instant::now();
        lc.show(payload("q", "a"), config(30, true), t0);

        let t = lc.cancel().unwrap();
        assert_eq!((t.from, t.to), (Phase::FadingIn, Phase::Hidden));
        assert_eq!(lc.phase(), Phase::Hidden);
        assert_eq!(lc.next_deadline(), None);
        assert!(lc.tick(t0 + Duration::from_secs(60)).is_empty());
        assert!(lc.cancel().is_none());
    }
}
