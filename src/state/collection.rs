//! Ordered timer collection and its persistence gateway

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::timer::{Timer, TimerId};
use crate::{
    error::{Result, TimerError},
    store::KeyValueStore,
};

/// Fixed key the whole collection is stored under
pub const TIMERS_KEY: &str = "savedTimers";

/// User-ordered list of timers; the unit of persistence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerCollection {
    timers: Vec<Timer>,
}

impl TimerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.timers.iter()
    }

    pub fn ids(&self) -> Vec<TimerId> {
        self.timers.iter().map(Timer::id).collect()
    }

    pub fn get(&self, id: TimerId) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: TimerId) -> Result<&mut Timer> {
        self.timers
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or(TimerError::NotFound(id))
    }

    /// Append a new idle timer and return its id
    pub fn add(&mut self, name: impl Into<String>, now: DateTime<Utc>) -> Result<TimerId> {
        let timer = Timer::new(name, now)?;
        let id = timer.id();
        debug!("Adding timer '{}' ({})", timer.name(), id);
        self.timers.push(timer);
        Ok(id)
    }

    pub fn remove(&mut self, id: TimerId) -> Result<Timer> {
        let index = self
            .timers
            .iter()
            .position(|t| t.id() == id)
            .ok_or(TimerError::NotFound(id))?;
        Ok(self.timers.remove(index))
    }

    /// Move the timer at `from` so that it ends up at index `to`
    pub fn move_timer(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.timers.len();
        if from >= len || to >= len {
            return Err(TimerError::invalid(format!(
                "cannot move {} to {} in a list of {}",
                from, to, len
            )));
        }
        if from == to {
            return Ok(());
        }
        let timer = self.timers.remove(from);
        self.timers.insert(to, timer);
        Ok(())
    }

    pub fn reset_all(&mut self) {
        for timer in &mut self.timers {
            timer.stop();
        }
    }

    /// Drive every timer's accrual tick up to `now`
    pub fn poll_ticks(&mut self, now: DateTime<Utc>) {
        for timer in &mut self.timers {
            timer.poll_tick(now);
        }
    }

    /// Serialize the collection under [`TIMERS_KEY`], stamping each timer's
    /// last-active time with `now`
    pub fn save(&mut self, store: &dyn KeyValueStore, now: DateTime<Utc>) -> Result<()> {
        for timer in &mut self.timers {
            timer.mark_active(now);
        }
        let bytes = serde_json::to_vec(&self.timers)
            .map_err(|e| TimerError::PersistenceCorrupt(e.to_string()))?;
        store.set(TIMERS_KEY, &bytes)?;
        debug!("Saved {} timers", self.timers.len());
        Ok(())
    }

    /// Load the saved collection, reporting corrupt data as an error
    pub fn try_load(store: &dyn KeyValueStore, now: DateTime<Utc>) -> Result<Self> {
        let Some(bytes) = store.get(TIMERS_KEY)? else {
            return Ok(Self::new());
        };
        let mut timers: Vec<Timer> = serde_json::from_slice(&bytes)
            .map_err(|e| TimerError::PersistenceCorrupt(e.to_string()))?;
        for timer in &mut timers {
            timer.restore(now);
        }
        Ok(Self { timers })
    }

    /// Load the saved collection; anything unreadable counts as no saved state
    pub fn load(store: &dyn KeyValueStore, now: DateTime<Utc>) -> Self {
        match Self::try_load(store, now) {
            Ok(collection) => {
                info!("Loaded {} saved timers", collection.len());
                collection
            }
            Err(e) => {
                warn!("Discarding saved timers: {}", e);
                Self::new()
            }
        }
    }

    /// Suspend every timer, then persist
    pub fn broadcast_suspend(&mut self, store: &dyn KeyValueStore, now: DateTime<Utc>) -> Result<()> {
        for timer in &mut self.timers {
            timer.suspend(now);
        }
        self.save(store, now)
    }

    pub fn broadcast_resume(&mut self, now: DateTime<Utc>) {
        for timer in &mut self.timers {
            timer.resume(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::{RunState, VisitType},
        store::MemoryStore,
    };
    use chrono::Duration;

    fn at(start: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        start + Duration::seconds(secs)
    }

    fn names(collection: &TimerCollection) -> Vec<String> {
        collection.iter().map(|t| t.name().to_string()).collect()
    }

    #[test]
    fn add_rejects_empty_name() {
        let mut timers = TimerCollection::new();
        timers.add("Room 1", Utc::now()).unwrap();
        assert!(matches!(
            timers.add("", Utc::now()),
            Err(TimerError::InvalidArgument(_))
        ));
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn remove_twice_reports_not_found() {
        let mut timers = TimerCollection::new();
        let id = timers.add("Room 1", Utc::now()).unwrap();
        assert_eq!(timers.remove(id).unwrap().name(), "Room 1");
        assert!(matches!(timers.remove(id), Err(TimerError::NotFound(missing)) if missing == id));
        assert!(timers.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let mut timers = TimerCollection::new();
        let a = timers.add("A", Utc::now()).unwrap();
        let b = timers.add("A", Utc::now()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn move_reorders_and_keeps_everything() {
        let now = Utc::now();
        let mut timers = TimerCollection::new();
        for name in ["A", "B", "C", "D"] {
            timers.add(name, now).unwrap();
        }

        timers.move_timer(0, 2).unwrap();
        assert_eq!(names(&timers), ["B", "C", "A", "D"]);
        timers.move_timer(3, 0).unwrap();
        assert_eq!(names(&timers), ["D", "B", "C", "A"]);
        timers.move_timer(1, 1).unwrap();
        assert_eq!(names(&timers), ["D", "B", "C", "A"]);
        assert!(timers.move_timer(0, 4).is_err());
        assert_eq!(timers.len(), 4);
    }

    #[test]
    fn reset_all_stops_every_timer() {
        let start = Utc::now();
        let mut timers = TimerCollection::new();
        let a = timers.add("A", start).unwrap();
        let b = timers.add("B", start).unwrap();
        timers.get_mut(a).unwrap().start(start);
        timers.get_mut(b).unwrap().start(start);
        timers.get_mut(b).unwrap().pause(start);
        timers.poll_ticks(at(start, 30));

        timers.reset_all();
        for timer in timers.iter() {
            assert_eq!(timer.run_state(), RunState::Idle);
            assert_eq!(timer.elapsed_seconds(), 0.0);
        }
    }

    #[test]
    fn save_then_load_round_trips_in_order() {
        let start = Utc::now();
        let store = MemoryStore::new();
        let mut timers = TimerCollection::new();
        let a = timers.add("New Patient", start).unwrap();
        let b = timers.add("Phone call", start).unwrap();
        timers.add("Bed 3", start).unwrap();
        timers.get_mut(a).unwrap().start(start);
        timers.get_mut(b).unwrap().start(start);
        timers.poll_ticks(at(start, 75));
        timers.get_mut(b).unwrap().pause(at(start, 75));
        timers.move_timer(2, 0).unwrap();

        timers.save(&store, at(start, 75)).unwrap();
        let loaded = TimerCollection::load(&store, at(start, 75));

        assert_eq!(loaded, timers);
        assert_eq!(names(&loaded), ["Bed 3", "New Patient", "Phone call"]);
        assert_eq!(loaded.get(b).unwrap().visit_type(), VisitType::Phone);
    }

    #[test]
    fn fractional_elapsed_time_round_trips() {
        let start = Utc::now();
        let store = MemoryStore::new();
        let mut timers = TimerCollection::new();
        let id = timers.add("Room 1", start).unwrap();
        timers.get_mut(id).unwrap().start(start);
        timers.poll_ticks(at(start, 7));

        timers.broadcast_suspend(&store, at(start, 7)).unwrap();
        timers.broadcast_resume(at(start, 7) + Duration::milliseconds(2_250));
        timers.get_mut(id).unwrap().pause(at(start, 10));
        assert_eq!(timers.get(id).unwrap().elapsed_seconds(), 9.25);

        timers.save(&store, at(start, 10)).unwrap();
        let loaded = TimerCollection::load(&store, at(start, 10));
        assert_eq!(loaded, timers);
        assert_eq!(loaded.get(id).unwrap().elapsed_seconds(), 9.25);
    }

    #[test]
    fn save_is_idempotent() {
        let now = Utc::now();
        let store = MemoryStore::new();
        let mut timers = TimerCollection::new();
        timers.add("A", now).unwrap();

        timers.save(&store, now).unwrap();
        let first = store.get(TIMERS_KEY).unwrap();
        timers.save(&store, now).unwrap();
        assert_eq!(store.get(TIMERS_KEY).unwrap(), first);
    }

    #[test]
    fn save_stamps_last_active_time() {
        let start = Utc::now();
        let store = MemoryStore::new();
        let mut timers = TimerCollection::new();
        let id = timers.add("A", start).unwrap();

        timers.save(&store, at(start, 40)).unwrap();
        assert_eq!(timers.get(id).unwrap().last_active_at(), at(start, 40));
    }

    #[test]
    fn load_without_saved_state_is_empty() {
        let store = MemoryStore::new();
        assert!(TimerCollection::load(&store, Utc::now()).is_empty());
    }

    #[test]
    fn corrupt_state_loads_as_empty() {
        let store = MemoryStore::new();
        store.set(TIMERS_KEY, b"{not json").unwrap();
        assert!(TimerCollection::load(&store, Utc::now()).is_empty());
        assert!(matches!(
            TimerCollection::try_load(&store, Utc::now()),
            Err(TimerError::PersistenceCorrupt(_))
        ));
    }

    #[test]
    fn suspend_saves_and_resume_credits_gap() {
        let start = Utc::now();
        let store = MemoryStore::new();
        let mut timers = TimerCollection::new();
        let running = timers.add("Running", start).unwrap();
        let paused = timers.add("Paused", start).unwrap();
        let idle = timers.add("Idle", start).unwrap();
        timers.get_mut(running).unwrap().start(start);
        timers.get_mut(paused).unwrap().start(start);
        timers.poll_ticks(at(start, 20));
        timers.get_mut(paused).unwrap().pause(at(start, 20));

        timers.broadcast_suspend(&store, at(start, 20)).unwrap();
        assert!(store.get(TIMERS_KEY).unwrap().is_some());
        assert!(timers.get(running).unwrap().backgrounded_at().is_some());
        assert!(timers.get(paused).unwrap().backgrounded_at().is_none());

        timers.broadcast_resume(at(start, 20 + 300));
        assert_eq!(timers.get(running).unwrap().elapsed_seconds(), 320.0);
        assert_eq!(timers.get(paused).unwrap().elapsed_seconds(), 20.0);
        assert_eq!(timers.get(idle).unwrap().elapsed_seconds(), 0.0);
    }

    #[test]
    fn restart_after_suspend_resumes_from_saved_state() {
        let start = Utc::now();
        let store = MemoryStore::new();
        let mut timers = TimerCollection::new();
        let id = timers.add("Room 1", start).unwrap();
        timers.get_mut(id).unwrap().start(start);
        timers.poll_ticks(at(start, 50));
        timers.broadcast_suspend(&store, at(start, 50)).unwrap();

        let mut restored = TimerCollection::load(&store, at(start, 650));
        assert_eq!(restored.get(id).unwrap().elapsed_seconds(), 50.0);
        restored.broadcast_resume(at(start, 650));
        assert_eq!(restored.get(id).unwrap().elapsed_seconds(), 650.0);
    }
}
