//! Single timer state machine and elapsed-time accounting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{tick::TickHandle, visit::VisitType};
use crate::error::{Result, TimerError};

pub type TimerId = Uuid;

/// Resting states of a timer. Stop is an action that returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
        }
    }
}

/// A named visit timer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TimerRecord", into = "TimerRecord")]
pub struct Timer {
    id: TimerId,
    name: String,
    elapsed_seconds: f64,
    run_state: RunState,
    last_active_at: DateTime<Utc>,
    backgrounded_at: Option<DateTime<Utc>>,
    tick: Option<TickHandle>,
}

impl Timer {
    /// Create an idle timer with a fresh id
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Result<Self> {
        let name = validate_name(name.into())?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            elapsed_seconds: 0.0,
            run_state: RunState::Idle,
            last_active_at: now,
            backgrounded_at: None,
            tick: None,
        })
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    /// True once started and until stopped, including while paused
    pub fn is_running(&self) -> bool {
        self.run_state != RunState::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.run_state == RunState::Paused
    }

    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    pub fn backgrounded_at(&self) -> Option<DateTime<Utc>> {
        self.backgrounded_at
    }

    /// Whether an accrual tick is currently scheduled
    pub fn has_tick(&self) -> bool {
        self.tick.is_some()
    }

    pub fn visit_type(&self) -> VisitType {
        VisitType::classify(&self.name)
    }

    pub fn complexity_code(&self) -> u8 {
        self.complexity_code_for(self.visit_type())
    }

    pub fn complexity_code_for(&self, visit_type: VisitType) -> u8 {
        visit_type.complexity_code(self.elapsed_seconds)
    }

    /// Elapsed time as `MM:SS`, or `HH:MM:SS` past the first hour
    pub fn formatted_elapsed(&self) -> String {
        let total = self.elapsed_seconds as u64;
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;
        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.poll_tick(now);
        match self.run_state {
            RunState::Running => {}
            RunState::Idle => {
                self.run_state = RunState::Running;
                self.tick = Some(TickHandle::schedule(now));
                debug!("Timer '{}' started", self.name);
            }
            RunState::Paused => {
                self.run_state = RunState::Running;
                if self.tick.is_none() {
                    self.tick = Some(TickHandle::schedule(now));
                }
                debug!("Timer '{}' resumed from pause", self.name);
            }
        }
    }

    /// Toggle between running and paused; idle timers are left alone
    pub fn pause(&mut self, now: DateTime<Utc>) {
        // An intent means the host is executing again
        if self.backgrounded_at.is_some() {
            self.resume(now);
        }
        self.poll_tick(now);
        self.run_state = match self.run_state {
            RunState::Idle => return,
            RunState::Running => RunState::Paused,
            RunState::Paused => {
                if self.tick.is_none() {
                    self.tick = Some(TickHandle::schedule(now));
                }
                RunState::Running
            }
        };
        debug!("Timer '{}' is now {}", self.name, self.run_state.as_str());
    }

    pub fn stop(&mut self) {
        self.tick = None;
        self.elapsed_seconds = 0.0;
        self.run_state = RunState::Idle;
        self.backgrounded_at = None;
        debug!("Timer '{}' stopped", self.name);
    }

    pub fn rename(&mut self, new_name: impl Into<String>) -> Result<()> {
        self.name = validate_name(new_name.into())?;
        Ok(())
    }

    /// Fire every tick due at `now`. Fires while paused are swallowed.
    pub fn poll_tick(&mut self, now: DateTime<Utc>) {
        let Some(tick) = self.tick.as_mut() else {
            return;
        };
        let fires = tick.fire_due(now);
        if fires > 0 && self.run_state == RunState::Running {
            self.elapsed_seconds += fires as f64;
        }
    }

    /// The host is about to stop executing us
    pub fn suspend(&mut self, now: DateTime<Utc>) {
        // Already backgrounded: keep the earliest instant so the gap is whole
        if self.run_state != RunState::Running || self.backgrounded_at.is_some() {
            return;
        }
        self.poll_tick(now);
        self.backgrounded_at = Some(now);
        self.tick = None;
        debug!("Timer '{}' backgrounded at {}", self.name, now);
    }

    /// The host resumed; credit the time no tick could fire
    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.run_state != RunState::Running {
            return;
        }
        let Some(since) = self.backgrounded_at.take() else {
            return;
        };
        let gap = seconds_between(since, now);
        self.elapsed_seconds += gap;
        self.tick = Some(TickHandle::schedule(now));
        debug!("Timer '{}' credited {:.0}s spent in background", self.name, gap);
    }

    /// Record the persistence timestamp
    pub(crate) fn mark_active(&mut self, now: DateTime<Utc>) {
        self.last_active_at = now;
    }

    /// Re-arm a freshly deserialized timer. Running timers that were not
    /// backgrounded are credited the time since they were last saved;
    /// backgrounded ones wait for `resume`.
    pub(crate) fn restore(&mut self, now: DateTime<Utc>) {
        match self.run_state {
            RunState::Idle => self.tick = None,
            RunState::Paused => self.tick = Some(TickHandle::schedule(now)),
            RunState::Running if self.backgrounded_at.is_some() => self.tick = None,
            RunState::Running => {
                self.elapsed_seconds += seconds_between(self.last_active_at, now);
                self.tick = Some(TickHandle::schedule(now));
            }
        }
    }
}

/// Equality over the persisted fields; the tick schedule is runtime-only
impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.elapsed_seconds == other.elapsed_seconds
            && self.run_state == other.run_state
            && self.last_active_at == other.last_active_at
            && self.backgrounded_at == other.backgrounded_at
    }
}

fn validate_name(name: String) -> Result<String> {
    if name.trim().is_empty() {
        return Err(TimerError::invalid("timer name must not be empty"));
    }
    Ok(name)
}

/// Non-negative seconds from `from` to `to`; clock skew counts as zero
fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds();
    (millis.max(0) as f64) / 1000.0
}

/// On-disk shape of a timer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerRecord {
    pub id: TimerId,
    pub name: String,
    pub elapsed_seconds: f64,
    pub is_running: bool,
    pub is_paused: bool,
    pub last_active_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backgrounded_at: Option<DateTime<Utc>>,
}

impl From<Timer> for TimerRecord {
    fn from(timer: Timer) -> Self {
        Self {
            id: timer.id,
            name: timer.name,
            elapsed_seconds: timer.elapsed_seconds,
            is_running: timer.run_state != RunState::Idle,
            is_paused: timer.run_state == RunState::Paused,
            last_active_at: timer.last_active_at,
            backgrounded_at: timer.backgrounded_at,
        }
    }
}

impl TryFrom<TimerRecord> for Timer {
    type Error = TimerError;

    fn try_from(record: TimerRecord) -> Result<Self> {
        if !record.elapsed_seconds.is_finite() || record.elapsed_seconds < 0.0 {
            return Err(TimerError::PersistenceCorrupt(format!(
                "timer {} has invalid elapsed time {}",
                record.id, record.elapsed_seconds
            )));
        }
        let run_state = match (record.is_running, record.is_paused) {
            (false, _) => RunState::Idle,
            (true, false) => RunState::Running,
            (true, true) => RunState::Paused,
        };
        // Only a running timer can have been backgrounded
        let backgrounded_at = if run_state == RunState::Running {
            record.backgrounded_at
        } else {
            None
        };
        Ok(Self {
            id: record.id,
            name: record.name,
            elapsed_seconds: record.elapsed_seconds,
            run_state,
            last_active_at: record.last_active_at,
            backgrounded_at,
            tick: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(start: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        start + Duration::seconds(secs)
    }

    fn running_timer(name: &str, start: DateTime<Utc>) -> Timer {
        let mut timer = Timer::new(name, start).unwrap();
        timer.start(start);
        timer
    }

    #[test]
    fn new_timer_is_idle_and_zeroed() {
        let timer = Timer::new("Room 2", Utc::now()).unwrap();
        assert_eq!(timer.run_state(), RunState::Idle);
        assert_eq!(timer.elapsed_seconds(), 0.0);
        assert!(!timer.has_tick());
        assert!(timer.backgrounded_at().is_none());
    }

    #[test]
    fn empty_names_are_rejected() {
        assert!(matches!(
            Timer::new("", Utc::now()),
            Err(TimerError::InvalidArgument(_))
        ));
        let mut timer = Timer::new("Room 2", Utc::now()).unwrap();
        assert!(matches!(timer.rename("   "), Err(TimerError::InvalidArgument(_))));
        assert_eq!(timer.name(), "Room 2");
    }

    #[test]
    fn running_timer_accrues_one_second_per_tick() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);

        timer.poll_tick(at(start, 1));
        assert_eq!(timer.elapsed_seconds(), 1.0);
        timer.poll_tick(at(start, 30));
        assert_eq!(timer.elapsed_seconds(), 30.0);
        assert_eq!(timer.formatted_elapsed(), "00:30");
    }

    #[test]
    fn repeated_start_does_not_double_tick() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.start(start);
        timer.start(at(start, 0));

        timer.poll_tick(at(start, 10));
        assert_eq!(timer.elapsed_seconds(), 10.0);
    }

    #[test]
    fn pause_toggles_and_suppresses_accrual() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);

        timer.pause(at(start, 5));
        assert_eq!(timer.run_state(), RunState::Paused);
        assert_eq!(timer.elapsed_seconds(), 5.0);
        assert!(timer.has_tick());

        timer.poll_tick(at(start, 60));
        assert_eq!(timer.elapsed_seconds(), 5.0);

        timer.pause(at(start, 60));
        assert_eq!(timer.run_state(), RunState::Running);
        timer.poll_tick(at(start, 70));
        assert_eq!(timer.elapsed_seconds(), 15.0);
    }

    #[test]
    fn start_from_paused_resumes_accrual() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.pause(at(start, 3));
        timer.start(at(start, 100));
        timer.poll_tick(at(start, 102));
        assert_eq!(timer.elapsed_seconds(), 5.0);
    }

    #[test]
    fn pause_on_idle_is_a_no_op() {
        let start = Utc::now();
        let mut timer = Timer::new("Room 2", start).unwrap();
        timer.pause(start);
        assert_eq!(timer.run_state(), RunState::Idle);
        assert!(!timer.has_tick());
    }

    #[test]
    fn stop_always_resets() {
        let start = Utc::now();
        for pause_first in [false, true] {
            let mut timer = running_timer("Room 2", start);
            timer.poll_tick(at(start, 42));
            if pause_first {
                timer.pause(at(start, 42));
            }
            timer.stop();
            assert_eq!(timer.elapsed_seconds(), 0.0);
            assert_eq!(timer.run_state(), RunState::Idle);
            assert!(!timer.has_tick());
            timer.poll_tick(at(start, 100));
            assert_eq!(timer.elapsed_seconds(), 0.0);
        }
    }

    #[test]
    fn suspend_and_resume_credit_the_gap_exactly() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.poll_tick(at(start, 120));
        assert_eq!(timer.elapsed_seconds(), 120.0);

        timer.suspend(at(start, 120));
        assert_eq!(timer.backgrounded_at(), Some(at(start, 120)));
        assert!(!timer.has_tick());

        timer.resume(at(start, 120 + 900));
        assert_eq!(timer.elapsed_seconds(), 1020.0);
        assert!(timer.backgrounded_at().is_none());
        assert!(timer.has_tick());

        // No double counting once ticks resume
        timer.poll_tick(at(start, 1021));
        assert_eq!(timer.elapsed_seconds(), 1021.0);
    }

    #[test]
    fn repeated_suspend_keeps_the_first_background_instant() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.poll_tick(at(start, 10));

        timer.suspend(at(start, 10));
        timer.suspend(at(start, 310));
        assert_eq!(timer.backgrounded_at(), Some(at(start, 10)));

        timer.resume(at(start, 410));
        assert_eq!(timer.elapsed_seconds(), 410.0);
    }

    #[test]
    fn suspend_while_paused_changes_nothing() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.pause(at(start, 30));

        timer.suspend(at(start, 30));
        assert!(timer.backgrounded_at().is_none());
        timer.resume(at(start, 3_600));
        assert_eq!(timer.elapsed_seconds(), 30.0);
        assert_eq!(timer.run_state(), RunState::Paused);
    }

    #[test]
    fn pausing_a_backgrounded_timer_credits_the_gap_first() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.suspend(at(start, 10));
        timer.pause(at(start, 40));
        assert_eq!(timer.run_state(), RunState::Paused);
        assert_eq!(timer.elapsed_seconds(), 40.0);
        assert!(timer.backgrounded_at().is_none());
    }

    #[test]
    fn resume_without_suspend_is_a_no_op() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.resume(at(start, 500));
        assert_eq!(timer.elapsed_seconds(), 0.0);
    }

    #[test]
    fn clock_skew_never_reduces_elapsed_time() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.poll_tick(at(start, 60));
        timer.suspend(at(start, 60));
        timer.resume(at(start, -600));
        assert_eq!(timer.elapsed_seconds(), 60.0);
    }

    #[test]
    fn new_patient_visit_crosses_into_code_two() {
        let start = Utc::now();
        let mut timer = running_timer("New Patient Visit", start);
        assert_eq!(timer.visit_type(), VisitType::New);

        timer.poll_tick(at(start, 19 * 60 + 59));
        assert_eq!(timer.complexity_code(), 1);
        timer.poll_tick(at(start, 20 * 60));
        assert_eq!(timer.complexity_code(), 1);
        timer.poll_tick(at(start, 20 * 60 + 1));
        assert_eq!(timer.complexity_code(), 2);
        assert_eq!(timer.complexity_code_for(VisitType::Established), 3);
    }

    #[test]
    fn rename_reclassifies_immediately() {
        let mut timer = Timer::new("Follow up", Utc::now()).unwrap();
        assert_eq!(timer.visit_type(), VisitType::Established);
        timer.rename("Phone follow up").unwrap();
        assert_eq!(timer.visit_type(), VisitType::Phone);
    }

    #[test]
    fn formatted_elapsed_shows_hours_when_needed() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.poll_tick(at(start, 3_725));
        assert_eq!(timer.formatted_elapsed(), "01:02:05");
    }

    #[test]
    fn record_flags_follow_run_state() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.pause(start);
        let record = TimerRecord::from(timer.clone());
        assert!(record.is_running);
        assert!(record.is_paused);

        let json = serde_json::to_value(&timer).unwrap();
        assert_eq!(json["isRunning"], true);
        assert_eq!(json["isPaused"], true);
        assert!(json.get("backgroundedAt").is_none());
    }

    #[test]
    fn negative_elapsed_record_is_corrupt() {
        let json = format!(
            r#"{{"id":"{}","name":"x","elapsedSeconds":-3,"isRunning":false,"isPaused":false,"lastActiveAt":"2024-11-07T10:00:00Z"}}"#,
            Uuid::new_v4()
        );
        assert!(serde_json::from_str::<Timer>(&json).is_err());
    }

    #[test]
    fn restore_credits_time_since_last_save() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.poll_tick(at(start, 10));
        timer.mark_active(at(start, 10));

        let mut restored: Timer =
            serde_json::from_value(serde_json::to_value(&timer).unwrap()).unwrap();
        restored.restore(at(start, 70));
        assert_eq!(restored.elapsed_seconds(), 70.0);
        assert!(restored.has_tick());
    }

    #[test]
    fn restore_leaves_backgrounded_timers_for_resume() {
        let start = Utc::now();
        let mut timer = running_timer("Room 2", start);
        timer.suspend(at(start, 10));
        timer.mark_active(at(start, 10));

        let mut restored: Timer =
            serde_json::from_value(serde_json::to_value(&timer).unwrap()).unwrap();
        restored.restore(at(start, 70));
        assert_eq!(restored.elapsed_seconds(), 10.0);
        assert!(!restored.has_tick());

        restored.resume(at(start, 70));
        assert_eq!(restored.elapsed_seconds(), 70.0);
    }
}
