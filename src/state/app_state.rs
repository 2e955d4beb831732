//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{TimerCollection, TimerEvent, TimerId, TimerSnapshot};
use crate::{
    clock::Clock,
    error::{Result, TimerError},
    store::KeyValueStore,
};

/// Shared owner of the timer list, its store and clock.
///
/// Every intent goes through the one mutex, so handlers, the accrual driver
/// and lifecycle signals observe each other in issue order.
pub struct AppState {
    timers: Mutex<TimerCollection>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// Set between a suspend and the following resume
    suspended: Mutex<bool>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Mutex<Option<String>>,
    pub last_action_time: Mutex<Option<DateTime<Utc>>>,
    /// Channel for change notifications
    pub state_change_tx: broadcast::Sender<TimerEvent>,
}

impl AppState {
    /// Create the state, loading whatever the store has saved
    pub fn new(port: u16, host: String, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let timers = TimerCollection::load(store.as_ref(), clock.now());
        Self::with_timers(port, host, timers, store, clock)
    }

    pub fn with_timers(
        port: u16,
        host: String,
        timers: TimerCollection,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state_change_tx, _) = broadcast::channel(100);

        Self {
            timers: Mutex::new(timers),
            store,
            clock,
            suspended: Mutex::new(false),
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
            state_change_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.state_change_tx.subscribe()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `f` against the collection with ticks brought up to date first
    fn with_timers_mut<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut TimerCollection, DateTime<Utc>) -> Result<T>,
    {
        let now = self.clock.now();
        let mut timers = self.timers.lock().map_err(|_| TimerError::StatePoisoned)?;
        timers.poll_ticks(now);
        f(&mut timers, now)
    }

    /// Apply `updater` to one timer and publish `event` on success
    fn update_timer<F>(&self, action: &str, id: TimerId, updater: F) -> Result<TimerSnapshot>
    where
        F: FnOnce(&mut super::Timer, DateTime<Utc>) -> Result<TimerEvent>,
    {
        let (snapshot, event) = self.with_timers_mut(|timers, now| {
            let timer = timers.get_mut(id)?;
            let event = updater(timer, now)?;
            Ok((TimerSnapshot::from(&*timer), event))
        })?;
        self.record(action, event);
        Ok(snapshot)
    }

    /// Track the last action and notify listeners
    fn record(&self, action: &str, event: TimerEvent) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(self.clock.now());
        }

        if let Err(e) = self.state_change_tx.send(event) {
            debug!("No listeners for state change: {}", e);
        }
    }

    pub fn list_timers(&self) -> Result<Vec<TimerSnapshot>> {
        self.with_timers_mut(|timers, _| Ok(timers.iter().map(TimerSnapshot::from).collect()))
    }

    pub fn get_timer(&self, id: TimerId) -> Result<TimerSnapshot> {
        self.with_timers_mut(|timers, _| {
            timers
                .get(id)
                .map(TimerSnapshot::from)
                .ok_or(TimerError::NotFound(id))
        })
    }

    pub fn add_timer(&self, name: &str) -> Result<TimerSnapshot> {
        let snapshot = self.with_timers_mut(|timers, now| {
            let id = timers.add(name, now)?;
            timers.get(id).map(TimerSnapshot::from).ok_or(TimerError::NotFound(id))
        })?;
        info!("Added timer '{}'", snapshot.name);
        self.record("add", TimerEvent::Added { id: snapshot.id });
        Ok(snapshot)
    }

    pub fn remove_timer(&self, id: TimerId) -> Result<()> {
        let removed = self.with_timers_mut(|timers, _| timers.remove(id))?;
        info!("Removed timer '{}'", removed.name());
        self.record("remove", TimerEvent::Removed { id });
        Ok(())
    }

    pub fn rename_timer(&self, id: TimerId, name: &str) -> Result<TimerSnapshot> {
        self.update_timer("rename", id, |timer, _| {
            timer.rename(name)?;
            Ok(TimerEvent::Renamed { id })
        })
    }

    pub fn start_timer(&self, id: TimerId) -> Result<TimerSnapshot> {
        self.update_timer("start", id, |timer, now| {
            timer.start(now);
            Ok(TimerEvent::Started { id })
        })
    }

    /// Toggle pause on one timer
    pub fn pause_timer(&self, id: TimerId) -> Result<TimerSnapshot> {
        self.update_timer("pause", id, |timer, now| {
            timer.pause(now);
            Ok(TimerEvent::PauseToggled {
                id,
                run_state: timer.run_state(),
            })
        })
    }

    pub fn stop_timer(&self, id: TimerId) -> Result<TimerSnapshot> {
        self.update_timer("stop", id, |timer, _| {
            timer.stop();
            Ok(TimerEvent::Stopped { id })
        })
    }

    pub fn move_timer(&self, from: usize, to: usize) -> Result<Vec<TimerSnapshot>> {
        let snapshots = self.with_timers_mut(|timers, _| {
            timers.move_timer(from, to)?;
            Ok(timers.iter().map(TimerSnapshot::from).collect())
        })?;
        self.record("move", TimerEvent::Moved { from, to });
        Ok(snapshots)
    }

    pub fn reset_all(&self) -> Result<Vec<TimerSnapshot>> {
        let snapshots = self.with_timers_mut(|timers, _| {
            timers.reset_all();
            Ok(timers.iter().map(TimerSnapshot::from).collect::<Vec<_>>())
        })?;
        info!("Reset all {} timers", snapshots.len());
        self.record("reset", TimerEvent::ResetAll);
        Ok(snapshots)
    }

    /// Fire every accrual tick due by now
    pub fn poll_ticks(&self) -> Result<()> {
        self.with_timers_mut(|_, _| Ok(()))
    }

    /// Persist the current list
    pub fn save(&self) -> Result<()> {
        self.with_timers_mut(|timers, now| timers.save(self.store.as_ref(), now))?;
        if let Err(e) = self.state_change_tx.send(TimerEvent::Saved) {
            debug!("No listeners for save notification: {}", e);
        }
        Ok(())
    }

    /// The host is about to stop executing: background every running timer
    /// and persist
    pub fn suspend(&self) -> Result<()> {
        self.with_timers_mut(|timers, now| timers.broadcast_suspend(self.store.as_ref(), now))?;
        self.set_suspended(true)?;
        info!("Timers suspended and saved");
        self.record("suspend", TimerEvent::Suspended);
        Ok(())
    }

    /// The host regained execution: credit backgrounded timers
    pub fn resume(&self) -> Result<()> {
        self.with_timers_mut(|timers, now| {
            timers.broadcast_resume(now);
            Ok(())
        })?;
        self.set_suspended(false)?;
        info!("Timers resumed");
        self.record("resume", TimerEvent::Resumed);
        Ok(())
    }

    fn set_suspended(&self, suspended: bool) -> Result<()> {
        let mut state = self.suspended.lock().map_err(|_| TimerError::StatePoisoned)?;
        *state = suspended;
        Ok(())
    }

    pub fn is_suspended(&self) -> Result<bool> {
        self.suspended
            .lock()
            .map(|s| *s)
            .map_err(|_| TimerError::StatePoisoned)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
