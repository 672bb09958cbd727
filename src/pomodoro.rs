//! Pomodoro countdown: alternating focus and break phases, one tick per second.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::backend::{Backend, BackendError};
use crate::models::PomodoroSettings;
use crate::progress::{ProgressStore, POMODORO_XP};

pub const POMODORO_XP_REASON: &str = "Pomodoro session completed";

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Focus,
    Break,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PhaseEvent {
    /// A focus phase ran out. `sessions` is the count including this one.
    FocusCompleted { sessions: u32, long_break: bool },
    BreakCompleted,
}

/// Countdown state. Only the methods below change it.
///
/// `running` is independent of the phase: pausing never changes the phase or the
/// session count. A phase that runs out stops the timer; `start` begins the next one.
#[derive(Debug, Clone, Serialize)]
pub struct PomodoroTimer {
    settings: PomodoroSettings,
    phase: Phase,
    remaining_secs: u32,
    sessions: u32,
    running: bool,
}

fn minutes(value: u32) -> u32 {
    value.saturating_mul(60)
}

impl PomodoroTimer {
    pub fn new(settings: PomodoroSettings) -> Self {
        let remaining_secs = minutes(settings.focus_duration);
        Self {
            settings,
            phase: Phase::Focus,
            remaining_secs,
            sessions: 0,
            running: false,
        }
    }

    pub fn settings(&self) -> &PomodoroSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    /// Back to a stopped focus phase. The session count is kept.
    pub fn reset(&mut self) {
        self.running = false;
        self.phase = Phase::Focus;
        self.remaining_secs = minutes(self.settings.focus_duration);
    }

    /// New settings take effect as a reset; an in-progress break is abandoned.
    pub fn apply_settings(&mut self, settings: PomodoroSettings) {
        self.settings = settings;
        self.reset();
    }

    fn sessions_per_cycle(&self) -> u32 {
        self.settings.sessions_before_long_break.max(1)
    }

    fn is_long_break_due(&self) -> bool {
        self.sessions > 0 && self.sessions % self.sessions_per_cycle() == 0
    }

    /// Length of the current phase in seconds.
    pub fn phase_total_secs(&self) -> u32 {
        match self.phase {
            Phase::Focus => minutes(self.settings.focus_duration),
            Phase::Break if self.is_long_break_due() => {
                minutes(self.settings.long_break_duration)
            }
            Phase::Break => minutes(self.settings.break_duration),
        }
    }

    pub fn progress_percent(&self) -> f64 {
        let total = self.phase_total_secs();
        if total == 0 {
            return 0.0;
        }
        let elapsed = total.saturating_sub(self.remaining_secs);
        f64::from(elapsed) / f64::from(total) * 100.0
    }

    /// Remaining time as `MM:SS`.
    pub fn format_remaining(&self) -> String {
        let mins = self.remaining_secs / 60;
        let secs = self.remaining_secs % 60;
        format!("{mins:02}:{secs:02}")
    }

    /// One second elapsed. Does nothing while paused.
    pub fn tick(&mut self) -> Option<PhaseEvent> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return None;
        }

        self.running = false;
        match self.phase {
            Phase::Focus => {
                self.sessions = self.sessions.saturating_add(1);
                self.phase = Phase::Break;
                let long_break = self.is_long_break_due();
                self.remaining_secs = self.phase_total_secs();
                Some(PhaseEvent::FocusCompleted {
                    sessions: self.sessions,
                    long_break,
                })
            }
            Phase::Break => {
                self.phase = Phase::Focus;
                self.remaining_secs = minutes(self.settings.focus_duration);
                Some(PhaseEvent::BreakCompleted)
            }
        }
    }
}

/// A timer wired to the progress store: every completed focus phase is worth XP.
pub struct PomodoroSession<B: ?Sized = dyn Backend> {
    timer: PomodoroTimer,
    progress: ProgressStore<B>,
}

impl<B: Backend + ?Sized> PomodoroSession<B> {
    pub fn new(settings: PomodoroSettings, progress: ProgressStore<B>) -> Self {
        Self {
            timer: PomodoroTimer::new(settings),
            progress,
        }
    }

    pub fn timer(&self) -> &PomodoroTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut PomodoroTimer {
        &mut self.timer
    }

    /// Advances the timer by one second and awards XP if a focus phase ended.
    pub async fn tick(&mut self) -> Result<Option<PhaseEvent>, BackendError> {
        let event = self.timer.tick();
        if let Some(PhaseEvent::FocusCompleted { sessions, long_break }) = event {
            log::info!("focus session completed sessions={sessions} long_break={long_break}");
            self.progress
                .add_xp(POMODORO_XP, POMODORO_XP_REASON, None)
                .await?;
        }
        Ok(event)
    }

    /// Runs the current phase to completion on a one-second interval.
    ///
    /// Ticks missed while the task was not polled are skipped, not replayed.
    /// Setting `cancel` to `true` (or dropping its sender) pauses the timer and
    /// returns `Ok(None)`; no tick runs after that.
    pub async fn run_phase(
        &mut self,
        cancel: &mut watch::Receiver<bool>,
        mut on_tick: impl FnMut(&PomodoroTimer),
    ) -> Result<Option<PhaseEvent>, BackendError> {
        if *cancel.borrow_and_update() {
            self.timer.pause();
            return Ok(None);
        }

        self.timer.start();
        let mut interval = tokio::time::interval(TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of a tokio interval completes immediately.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let event = self.tick().await?;
                    on_tick(&self.timer);
                    if event.is_some() {
                        return Ok(event);
                    }
                }
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow_and_update() {
                        self.timer.pause();
                        log::debug!(
                            "pomodoro phase cancelled remaining={}",
                            self.timer.format_remaining()
                        );
                        return Ok(None);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::storage::Storage;
    use std::sync::Arc;

    fn settings(focus: u32, short: u32, long: u32, every: u32) -> PomodoroSettings {
        PomodoroSettings {
            focus_duration: focus,
            break_duration: short,
            long_break_duration: long,
            sessions_before_long_break: every,
        }
    }

    fn session(
        settings: PomodoroSettings,
    ) -> (PomodoroSession<LocalBackend>, ProgressStore<LocalBackend>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new(Storage::new(dir.path().to_path_buf())));
        let progress = ProgressStore::new(backend);
        (
            PomodoroSession::new(settings, progress.clone()),
            progress,
            dir,
        )
    }

    fn run_to_event(timer: &mut PomodoroTimer) -> PhaseEvent {
        timer.start();
        loop {
            if let Some(event) = timer.tick() {
                return event;
            }
        }
    }

    #[test]
    fn new_timer_is_stopped_in_focus() {
        let timer = PomodoroTimer::new(PomodoroSettings::default());
        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.remaining_secs(), 25 * 60);
        assert_eq!(timer.sessions(), 0);
        assert!(!timer.is_running());
        assert_eq!(timer.format_remaining(), "25:00");
    }

    #[test]
    fn paused_timer_does_not_count_down() {
        let mut timer = PomodoroTimer::new(PomodoroSettings::default());
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining_secs(), 1500);

        timer.start();
        timer.tick();
        timer.pause();
        timer.tick();
        assert_eq!(timer.remaining_secs(), 1499);
        assert_eq!(timer.phase(), Phase::Focus);

        timer.toggle();
        assert!(timer.is_running());
        timer.tick();
        assert_eq!(timer.format_remaining(), "24:58");
    }

    #[tokio::test]
    async fn focus_phase_ends_after_1500_ticks_with_one_award() {
        let (mut session, progress, _dir) = session(PomodoroSettings::default());
        session.timer_mut().start();

        let mut events = Vec::new();
        for _ in 0..1499 {
            if let Some(event) = session.tick().await.unwrap() {
                events.push(event);
            }
        }
        assert!(events.is_empty());
        assert_eq!(session.timer().phase(), Phase::Focus);

        let event = session.tick().await.unwrap();
        assert_eq!(
            event,
            Some(PhaseEvent::FocusCompleted {
                sessions: 1,
                long_break: false
            })
        );
        assert_eq!(session.timer().phase(), Phase::Break);
        assert_eq!(session.timer().sessions(), 1);
        assert_eq!(session.timer().remaining_secs(), 5 * 60);
        assert!(!session.timer().is_running());

        let log = progress.xp_log().await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].amount, 25);
        assert_eq!(log[0].reason, POMODORO_XP_REASON);
        assert_eq!(progress.fetch().await.unwrap().xp, 25);
    }

    #[test]
    fn fourth_session_earns_long_break() {
        let mut timer = PomodoroTimer::new(settings(1, 5, 15, 4));
        for expected in 1..=4 {
            let event = run_to_event(&mut timer);
            assert_eq!(
                event,
                PhaseEvent::FocusCompleted {
                    sessions: expected,
                    long_break: expected == 4
                }
            );
            let expected_break = if expected == 4 { 15 } else { 5 };
            assert_eq!(timer.remaining_secs(), expected_break * 60);
            assert_eq!(timer.phase_total_secs(), expected_break * 60);
            assert_eq!(run_to_event(&mut timer), PhaseEvent::BreakCompleted);
            assert_eq!(timer.phase(), Phase::Focus);
            assert_eq!(timer.remaining_secs(), 60);
        }
    }

    #[test]
    fn reset_keeps_session_count() {
        let mut timer = PomodoroTimer::new(settings(1, 1, 2, 2));
        run_to_event(&mut timer);
        assert_eq!(timer.phase(), Phase::Break);
        timer.start();
        timer.tick();

        timer.reset();
        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.remaining_secs(), 60);
        assert!(!timer.is_running());
        assert_eq!(timer.sessions(), 1);
    }

    #[test]
    fn new_settings_stop_the_timer_and_restart_focus() {
        let mut timer = PomodoroTimer::new(settings(1, 1, 2, 2));
        run_to_event(&mut timer);
        timer.start();
        timer.tick();

        timer.apply_settings(settings(50, 10, 30, 3));
        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.remaining_secs(), 50 * 60);
        assert!(!timer.is_running());
        assert_eq!(timer.sessions(), 1);
        assert_eq!(timer.settings().sessions_before_long_break, 3);
    }

    #[test]
    fn progress_percent_follows_elapsed_time() {
        let mut timer = PomodoroTimer::new(settings(1, 1, 1, 1));
        assert_eq!(timer.progress_percent(), 0.0);
        timer.start();
        for _ in 0..30 {
            timer.tick();
        }
        assert_eq!(timer.progress_percent(), 50.0);
    }

    #[test]
    fn zero_session_setting_does_not_divide_by_zero() {
        let mut timer = PomodoroTimer::new(settings(1, 5, 15, 0));
        assert_eq!(
            run_to_event(&mut timer),
            PhaseEvent::FocusCompleted {
                sessions: 1,
                long_break: true
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_phase_counts_down_on_the_interval() {
        let (mut session, progress, _dir) = session(settings(1, 1, 1, 4));
        let (_cancel_tx, mut cancel_rx) = watch::channel(false);

        let mut ticks = 0;
        let started = tokio::time::Instant::now();
        let event = session
            .run_phase(&mut cancel_rx, |_| ticks += 1)
            .await
            .unwrap();

        assert_eq!(ticks, 60);
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(matches!(event, Some(PhaseEvent::FocusCompleted { sessions: 1, .. })));
        assert_eq!(progress.fetch().await.unwrap().xp, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_phase_stops_without_award() {
        let (mut session, progress, _dir) = session(settings(1, 1, 1, 4));
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let result = session.run_phase(&mut cancel_rx, |_| {}).await;
            (result.map_err(|e| e.to_string()), session)
        });
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        cancel_tx.send(true).unwrap();

        let (result, session) = handle.await.unwrap();
        assert_eq!(result, Ok(None));
        assert!(!session.timer().is_running());
        assert_eq!(session.timer().phase(), Phase::Focus);
        assert_eq!(session.timer().remaining_secs(), 50);
        assert!(progress.xp_log().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn already_cancelled_signal_never_starts() {
        let (mut session, _progress, _dir) = session(PomodoroSettings::default());
        let (_cancel_tx, mut cancel_rx) = watch::channel(true);
        let event = session.run_phase(&mut cancel_rx, |_| {}).await.unwrap();
        assert_eq!(event, None);
        assert!(!session.timer().is_running());
        assert_eq!(session.timer().remaining_secs(), 1500);
    }
}
