//! The typing test state machine.
//!
//! A [`Session`] moves `Idle -> Running -> Completed` and never backwards.
//! Timing starts on the first qualifying keystroke and the session completes
//! the first time the typed buffer is at least as long as the reference.
//! Completion is reported exactly once, as the return value of the
//! [`Session::handle_key`] call that caused it.

use std::time::{Duration, Instant};

use crate::scoring::{classify, score, Outcome, Score};
use crate::TICK_RATE_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
    Completed,
}

/// Keyboard input as seen by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    /// A bracketed paste; may add many characters in one event.
    Paste(String),
    Enter,
    Tab,
    /// Shift, Control, Alt and friends reported on their own.
    Modifier,
    /// Navigation and anything else without a character payload.
    Other,
}

impl Key {
    /// Whether this key may start the timer of an idle session.
    pub fn qualifies(&self) -> bool {
        matches!(self, Key::Char(_) | Key::Backspace | Key::Paste(_))
    }
}

/// Periodic tick owned by a session and driven by the hosting event loop.
///
/// Once cancelled it never fires again until restarted.
#[derive(Debug, Clone, Copy)]
pub struct TickTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl TickTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns true and schedules the next tick if the timer is due at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(Duration::from_millis(TICK_RATE_MS))
    }
}

/// Final figures of a completed session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionResult {
    /// words per minute, rounded to 2 decimals
    pub wpm: f64,
    /// percent, rounded to 1 decimal
    pub accuracy: f64,
    pub correct_chars: usize,
    pub typed_chars: usize,
    pub elapsed_secs: f64,
}

#[derive(Debug)]
pub struct Session {
    reference: String,
    reference_chars: usize,
    typed: String,
    status: Status,
    started_at: Option<Instant>,
    elapsed_secs: f64,
    score: Score,
    timer: TickTimer,
}

impl Session {
    pub fn new(reference: String) -> Self {
        Self::with_timer(reference, TickTimer::default())
    }

    pub fn with_timer(reference: String, timer: TickTimer) -> Self {
        let mut timer = timer;
        timer.cancel();
        Self {
            reference_chars: reference.chars().count(),
            reference,
            typed: String::new(),
            status: Status::Idle,
            started_at: None,
            elapsed_secs: 0.0,
            score: Score::default(),
            timer,
        }
    }

    /// Replaces this session with a fresh idle one for `reference`.
    pub fn reset(&mut self, reference: String) {
        self.timer.cancel();
        *self = Self::with_timer(reference, self.timer);
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        classify(&self.reference, &self.typed)
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// Applies one keystroke at `now`.
    ///
    /// Returns the final result only from the call that completes the
    /// session; completed sessions ignore all further input.
    pub fn handle_key(&mut self, key: Key, now: Instant) -> Option<SessionResult> {
        match self.status {
            Status::Completed => return None,
            Status::Idle if !key.qualifies() => return None,
            Status::Idle => self.start(now),
            Status::Running => {}
        }

        match key {
            Key::Char(c) => self.typed.push(c),
            Key::Backspace => {
                self.typed.pop();
            }
            Key::Paste(text) => self
                .typed
                .extend(text.chars().filter(|c| *c != '\n' && *c != '\r')),
            Key::Enter | Key::Tab | Key::Modifier | Key::Other => {}
        }

        self.refresh_elapsed(now);
        self.score = score(&self.reference, &self.typed, self.elapsed_secs);

        if self.score.typed_chars >= self.reference_chars {
            Some(self.complete())
        } else {
            None
        }
    }

    /// Drives the display clock. Returns true when the elapsed time changed.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        if self.status != Status::Running || !self.timer.poll(now) {
            return false;
        }
        self.refresh_elapsed(now);
        true
    }

    fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.status = Status::Running;
        self.timer.start(now);
    }

    fn refresh_elapsed(&mut self, now: Instant) {
        if let Some(started_at) = self.started_at {
            self.elapsed_secs = now.saturating_duration_since(started_at).as_secs_f64();
        }
    }

    fn complete(&mut self) -> SessionResult {
        self.status = Status::Completed;
        self.timer.cancel();
        let (wpm, accuracy) = self.score.rounded();
        SessionResult {
            wpm,
            accuracy,
            correct_chars: self.score.correct_chars,
            typed_chars: self.score.typed_chars,
            elapsed_secs: self.elapsed_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new("cat".to_string());
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.started_at(), None);
        assert_eq!(session.elapsed_secs(), 0.0);
        assert_eq!(session.score().accuracy, 100.0);
        assert!(!session.timer().is_active());
    }

    #[test]
    fn test_modifier_keys_do_not_start_the_timer() {
        let mut session = Session::new("cat".to_string());
        let now = Instant::now();
        for key in [Key::Modifier, Key::Tab, Key::Enter, Key::Other] {
            assert_eq!(session.handle_key(key, now), None);
        }
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.started_at(), None);
    }

    #[test]
    fn test_first_char_starts_the_session() {
        let mut session = Session::new("cat".to_string());
        let t0 = Instant::now();
        session.handle_key(Key::Char('c'), t0);
        assert_eq!(session.status(), Status::Running);
        assert_eq!(session.started_at(), Some(t0));
        assert!(session.timer().is_active());

        // start time is captured once only
        session.handle_key(Key::Char('a'), t0 + secs(1.0));
        assert_eq!(session.started_at(), Some(t0));
    }

    #[test]
    fn test_cat_scenario_completes_with_expected_score() {
        let mut session = Session::new("cat".to_string());
        let t0 = Instant::now();
        assert_eq!(session.handle_key(Key::Char('c'), t0), None);
        assert_eq!(session.handle_key(Key::Char('a'), t0 + secs(3.0)), None);
        let result = session.handle_key(Key::Char('t'), t0 + secs(6.0));

        let result = result.expect("third char completes the session");
        assert_eq!(result.correct_chars, 3);
        assert_eq!(result.accuracy, 100.0);
        assert_eq!(result.wpm, 6.0);
        assert!((result.elapsed_secs - 6.0).abs() < 1e-6);
        assert_eq!(session.status(), Status::Completed);
        assert!(!session.timer().is_active());
    }

    #[test]
    fn test_mistyped_cat_scenario() {
        let mut session = Session::new("cat".to_string());
        let t0 = Instant::now();
        session.handle_key(Key::Char('c'), t0);
        session.handle_key(Key::Char('b'), t0 + secs(2.0));
        let result = session.handle_key(Key::Char('t'), t0 + secs(6.0)).unwrap();
        assert_eq!(result.correct_chars, 2);
        assert_eq!(result.accuracy, 66.7);
        assert_eq!(result.wpm, 4.0);
    }

    #[test]
    fn test_completion_is_reported_exactly_once() {
        let mut session = Session::new("hi".to_string());
        let t0 = Instant::now();
        session.handle_key(Key::Char('h'), t0);
        assert!(session.handle_key(Key::Char('i'), t0 + secs(1.0)).is_some());

        let frozen = session.elapsed_secs();
        let typed = session.typed().to_string();
        assert_eq!(session.handle_key(Key::Char('x'), t0 + secs(5.0)), None);
        assert_eq!(session.handle_key(Key::Backspace, t0 + secs(6.0)), None);
        assert_eq!(
            session.handle_key(Key::Paste("more".into()), t0 + secs(7.0)),
            None
        );
        assert_eq!(session.typed(), typed);
        assert_eq!(session.elapsed_secs(), frozen);
        assert!(!session.on_tick(t0 + secs(10.0)));
    }

    #[test]
    fn test_clearing_input_keeps_running() {
        let mut session = Session::new("cat".to_string());
        let t0 = Instant::now();
        session.handle_key(Key::Char('c'), t0);
        session.handle_key(Key::Char('x'), t0 + secs(1.0));
        session.handle_key(Key::Backspace, t0 + secs(2.0));
        session.handle_key(Key::Backspace, t0 + secs(3.0));

        assert_eq!(session.typed(), "");
        assert_eq!(session.status(), Status::Running);
        assert_eq!(session.started_at(), Some(t0));
        assert_eq!(session.score().correct_chars, 0);
        assert_eq!(session.score().accuracy, 100.0);

        // backspace on an empty buffer is harmless
        assert_eq!(session.handle_key(Key::Backspace, t0 + secs(4.0)), None);
        assert_eq!(session.status(), Status::Running);
    }

    #[test]
    fn test_long_paste_scores_only_reference_positions() {
        let mut session = Session::new("cat".to_string());
        let t0 = Instant::now();
        session.handle_key(Key::Char('c'), t0);
        let result = session
            .handle_key(Key::Paste("atdog\n".into()), t0 + secs(6.0))
            .unwrap();
        assert_eq!(session.typed(), "catdog");
        assert_eq!(result.correct_chars, 3);
        assert_eq!(result.typed_chars, 6);
        assert_eq!(result.accuracy, 50.0);
        assert_eq!(result.wpm, 6.0);
    }

    #[test]
    fn test_paste_can_start_and_finish_a_session() {
        let mut session = Session::new("cat".to_string());
        let t0 = Instant::now();
        let result = session.handle_key(Key::Paste("cat".into()), t0);
        assert_matches!(result, Some(SessionResult { wpm, .. }) if wpm == 0.0);
        assert!(session.is_completed());
    }

    #[test]
    fn test_enter_does_not_edit() {
        let mut session = Session::new("cat".to_string());
        let t0 = Instant::now();
        session.handle_key(Key::Char('c'), t0);
        session.handle_key(Key::Enter, t0 + secs(1.0));
        session.handle_key(Key::Tab, t0 + secs(1.5));
        assert_eq!(session.typed(), "c");
    }

    #[test]
    fn test_tick_updates_elapsed_only_while_running() {
        let mut session = Session::with_timer(
            "cat".to_string(),
            TickTimer::new(Duration::from_millis(100)),
        );
        let t0 = Instant::now();
        assert!(!session.on_tick(t0 + secs(1.0)));

        session.handle_key(Key::Char('c'), t0);
        assert!(!session.on_tick(t0 + Duration::from_millis(50)));
        assert!(session.on_tick(t0 + Duration::from_millis(150)));
        assert!((session.elapsed_secs() - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_reset_cancels_timer_and_starts_over() {
        let mut session = Session::new("cat".to_string());
        let t0 = Instant::now();
        session.handle_key(Key::Char('c'), t0);
        assert!(session.timer().is_active());

        session.reset("dog".to_string());
        assert_eq!(session.reference(), "dog");
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.typed(), "");
        assert_eq!(session.started_at(), None);
        assert!(!session.timer().is_active());
        assert!(!session.on_tick(t0 + secs(5.0)));
    }

    #[test]
    fn test_timer_poll() {
        let mut timer = TickTimer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(!timer.poll(t0));
        timer.start(t0);
        assert!(!timer.poll(t0 + Duration::from_millis(99)));
        assert!(timer.poll(t0 + Duration::from_millis(100)));
        assert!(!timer.poll(t0 + Duration::from_millis(150)));
        timer.cancel();
        assert!(!timer.poll(t0 + secs(10.0)));
    }
}
