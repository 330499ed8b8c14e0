/*
 *  tasks/sensor_task.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Periodic sampling task - warm-up, rolling history, revision, persistence
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
//! A sensor task owns exactly one [`RollingSeries`]. Every accepted sample
//! goes through [`SampleLedger::save_measurement`], and the result is
//! published on a watch channel so pages read it without touching the
//! series itself.
//!
//! The revision counter wraps at the modulus: a page that misses exactly
//! `modulus` samples between two frames sees the same revision and draws
//! the readout as stale. At a 2s poll and a 25fps render loop that gap
//! would need a 100s stall of the render loop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;

use super::{lock, nap, stop_requested, WorkerHandle};
use crate::constants::{DEFAULT_REVISION_MODULUS, DEFAULT_SERIES_CAPACITY, DEFAULT_WARMUP_CYCLES};
use crate::sensors::SensorError;
use crate::storage::{BlobStore, RollingSeries, SeriesSnapshot};

/// Anything that yields one numeric sample per poll cycle.
pub trait SampleSource: Send + 'static {
    fn sample(&mut self) -> Result<f32, SensorError>;
}

#[derive(Debug, Clone)]
pub struct TaskSettings {
    /// Shown in logs and page headers.
    pub name: String,
    /// Store identity of the series.
    pub key: String,
    pub interval: Duration,
    /// 0 keeps no history.
    pub capacity: usize,
    pub warmup: u32,
    pub revision_modulus: u8,
}

impl TaskSettings {
    pub fn new(name: &str, interval: Duration) -> Self {
        Self {
            name: name.to_string(),
            key: name.to_ascii_lowercase(),
            interval,
            capacity: DEFAULT_SERIES_CAPACITY,
            warmup: DEFAULT_WARMUP_CYCLES,
            revision_modulus: DEFAULT_REVISION_MODULUS,
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn warmup(mut self, warmup: u32) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn revision_modulus(mut self, modulus: u8) -> Self {
        self.revision_modulus = modulus;
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }
}

/// What a task publishes after every accepted sample.
#[derive(Debug, Clone)]
pub struct Reading {
    pub latest: Option<f32>,
    pub revision: u8,
    pub history: SeriesSnapshot,
}

impl Default for Reading {
    fn default() -> Self {
        Self { latest: None, revision: 0, history: Arc::from(Vec::new()) }
    }
}

/// Warm-up, revision and series bookkeeping for one task.
#[derive(Debug)]
pub struct SampleLedger {
    series: RollingSeries,
    warmup_left: u32,
    revision: u8,
    modulus: u8,
    latest: Option<f32>,
}

impl SampleLedger {
    pub fn new(series: RollingSeries, warmup: u32, revision_modulus: u8) -> Self {
        Self {
            series,
            warmup_left: warmup,
            revision: 0,
            modulus: revision_modulus.max(1),
            latest: None,
        }
    }

    /// Record an accepted sample. Latest and revision always move; the
    /// series only grows once warm-up is over. Returns true when the
    /// sample was appended.
    pub fn save_measurement(&mut self, value: f32) -> bool {
        self.latest = Some(value);
        self.revision = (self.revision + 1) % self.modulus;

        if self.warmup_left > 0 {
            self.warmup_left -= 1;
            return false;
        }
        if self.series.capacity() == 0 {
            return false;
        }
        self.series.append(value);
        true
    }

    pub fn latest(&self) -> Option<f32> {
        self.latest
    }

    pub fn revision(&self) -> u8 {
        self.revision
    }

    pub fn warming_up(&self) -> bool {
        self.warmup_left > 0
    }

    pub fn series(&self) -> &RollingSeries {
        &self.series
    }

    pub fn reading(&self) -> Reading {
        Reading { latest: self.latest, revision: self.revision, history: self.series.snapshot() }
    }
}

/// One poll cycle's worth of work: source, ledger and store together.
/// Runs on the blocking pool; also driven directly by tests.
pub struct SampleCycle {
    name: String,
    source: Box<dyn SampleSource>,
    ledger: SampleLedger,
    store: Arc<dyn BlobStore>,
}

impl SampleCycle {
    pub fn new(settings: &TaskSettings, source: impl SampleSource, store: Arc<dyn BlobStore>) -> Self {
        let series = RollingSeries::open(store.as_ref(), &settings.key, settings.capacity);
        Self {
            name: settings.name.clone(),
            source: Box::new(source),
            ledger: SampleLedger::new(series, settings.warmup, settings.revision_modulus),
            store,
        }
    }

    /// Poll once. Returns the new reading, or None when the cycle produced
    /// no sample; failures end here.
    pub fn run_once(&mut self) -> Option<Reading> {
        let value = match self.source.sample() {
            Ok(v) if v.is_finite() => v,
            Ok(v) => {
                warn!("{}: {}", self.name, SensorError::NonFinite(v));
                return None;
            }
            Err(SensorError::NoData) => {
                debug!("{}: nothing new this cycle", self.name);
                return None;
            }
            Err(e) => {
                warn!("{}: no sample this cycle: {}", self.name, e);
                return None;
            }
        };

        if self.ledger.save_measurement(value) {
            if let Err(e) = self.ledger.series().persist(self.store.as_ref()) {
                warn!("{}: could not persist history: {}", self.name, e);
            }
        } else if self.ledger.warming_up() {
            debug!("{}: warming up, {} not kept", self.name, value);
        }
        Some(self.ledger.reading())
    }

    pub fn ledger(&self) -> &SampleLedger {
        &self.ledger
    }
}

/// Read-only handle on a task's published state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TaskView {
    name: Arc<str>,
    interval: Duration,
    capacity: usize,
    rx: watch::Receiver<Reading>,
}

impl TaskView {
    /// A view plus the sender feeding it.
    pub fn channel(settings: &TaskSettings, initial: Reading) -> (watch::Sender<Reading>, Self) {
        let (tx, rx) = watch::channel(initial);
        let view = Self {
            name: Arc::from(settings.name.as_str()),
            interval: settings.interval,
            capacity: settings.capacity,
            rx,
        };
        (tx, view)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reading(&self) -> Reading {
        self.rx.borrow().clone()
    }

    pub fn latest(&self) -> Option<f32> {
        self.rx.borrow().latest
    }

    pub fn revision(&self) -> u8 {
        self.rx.borrow().revision
    }

    pub fn history(&self) -> SeriesSnapshot {
        Arc::clone(&self.rx.borrow().history)
    }

    pub fn sample_count(&self) -> usize {
        self.rx.borrow().history.len()
    }
}

/// A running sensor task: the poll loop plus a view of what it publishes.
pub struct SensorTask {
    view: TaskView,
    worker: WorkerHandle,
}

impl SensorTask {
    /// Load the stored series and start polling straight away.
    pub fn spawn(settings: TaskSettings, source: impl SampleSource, store: Arc<dyn BlobStore>) -> Self {
        let cycle = SampleCycle::new(&settings, source, store);
        let (tx, view) = TaskView::channel(&settings, cycle.ledger().reading());
        let cycle = Arc::new(Mutex::new(cycle));

        let name = settings.name.clone();
        let interval = settings.interval;
        let worker = WorkerHandle::spawn(&settings.name, move |mut stop_rx| async move {
            info!("{name}: polling every {interval:?}");
            loop {
                if stop_requested(&mut stop_rx) {
                    break;
                }
                let cycle = Arc::clone(&cycle);
                match tokio::task::spawn_blocking(move || lock(&cycle).run_once()).await {
                    Ok(Some(reading)) => {
                        tx.send_replace(reading);
                    }
                    Ok(None) => {}
                    Err(e) => error!("{name}: poll cycle panicked: {e}"),
                }
                if nap(&mut stop_rx, interval).await {
                    break;
                }
            }
            info!("{name}: stopped");
        });

        Self { view, worker }
    }

    pub fn view(&self) -> TaskView {
        self.view.clone()
    }

    pub fn name(&self) -> &str {
        self.view.name()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    pub async fn stop(&mut self) {
        self.worker.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::collections::VecDeque;

    struct Fixed(VecDeque<Result<f32, SensorError>>);

    impl SampleSource for Fixed {
        fn sample(&mut self) -> Result<f32, SensorError> {
            self.0.pop_front().unwrap_or(Err(SensorError::NoData))
        }
    }

    fn ledger(capacity: usize, warmup: u32, modulus: u8) -> SampleLedger {
        SampleLedger::new(RollingSeries::new("t", capacity), warmup, modulus)
    }

    #[test]
    fn test_warmup_updates_latest_only() {
        let mut l = ledger(10, 5, 50);
        for i in 0..5 {
            assert!(!l.save_measurement(i as f32));
            assert_eq!(l.latest(), Some(i as f32));
            assert_eq!(l.series().len(), 0);
        }
        assert!(l.save_measurement(42.0));
        assert_eq!(l.series().len(), 1);
        assert_eq!(l.revision(), 6);
    }

    #[test]
    fn test_revision_wraps_at_modulus() {
        let mut l = ledger(10, 0, 50);
        let start = l.revision();
        for _ in 0..49 {
            l.save_measurement(1.0);
            assert_ne!(l.revision(), start);
        }
        l.save_measurement(1.0);
        assert_eq!(l.revision(), start);
    }

    #[test]
    fn test_zero_capacity_still_publishes() {
        let mut l = ledger(0, 0, 50);
        assert!(!l.save_measurement(12.5));
        assert_eq!(l.latest(), Some(12.5));
        assert_eq!(l.revision(), 1);
        assert!(l.reading().history.is_empty());
    }

    #[test]
    fn test_cycle_survives_failures_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let settings = TaskSettings::new("CO2", Duration::from_secs(5)).capacity(10).warmup(0);
        let source = Fixed(VecDeque::from([
            Ok(800.0),
            Err(SensorError::NotReady),
            Ok(f32::NAN),
            Ok(1200.0),
        ]));
        let mut cycle = SampleCycle::new(&settings, source, store.clone());

        assert!(cycle.run_once().is_some());
        assert!(cycle.run_once().is_none());
        assert!(cycle.run_once().is_none());
        let reading = cycle.run_once().unwrap();
        assert_eq!(reading.latest, Some(1200.0));
        assert_eq!(&*reading.history, &[800.0, 1200.0]);
        assert_eq!(reading.revision, 2);

        let restored = RollingSeries::load(store.as_ref(), "co2", 10).unwrap();
        assert_eq!(&*restored.snapshot(), &[800.0, 1200.0]);
    }

    #[tokio::test]
    async fn test_task_publishes_and_stops() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryStore::new());
        let settings = TaskSettings::new("Temperature", Duration::from_millis(5)).warmup(0);
        let source = Fixed(VecDeque::from([Ok(21.0), Ok(22.0)]));
        let mut task = SensorTask::spawn(settings, source, store);
        let view = task.view();

        let mut waited = 0;
        while view.sample_count() < 2 && waited < 200 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            waited += 1;
        }
        assert_eq!(view.latest(), Some(22.0));
        assert_eq!(view.sample_count(), 2);

        assert!(task.is_running());
        task.stop().await;
        assert!(!task.is_running());
    }
}
