/*
 *  tasks/mod.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Background workers - sensor polling, shared climate hub, plot rendering
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

pub mod climate;
pub mod gesture;
pub mod plot;
pub mod sensor_task;
pub mod sources;

pub use climate::{ClimateHub, ClimateReader, ClimateReading};
pub use gesture::GestureTask;
pub use plot::{PlotRenderTask, PlotSlot};
pub use sensor_task::{Reading, SampleCycle, SampleLedger, SampleSource, SensorTask, TaskSettings, TaskView};
pub use sources::{Co2Source, HumiditySource, PingSource, TemperatureSource};

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;

/// A spawned poll loop plus the channel that asks it to wind down.
///
/// Stopping is cooperative: the loop checks for the signal at the top of
/// each cycle and while it sleeps, and `stop` waits for the join.
pub struct WorkerHandle {
    name: String,
    stop_tx: Option<mpsc::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn<F, Fut>(name: &str, body: F) -> Self
    where
        F: FnOnce(mpsc::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let join = tokio::spawn(body(stop_rx));
        Self { name: name.to_string(), stop_tx: Some(stop_tx), join: Some(join) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Signal and join. Calling it again, or on a finished worker, is a no-op.
    /// If the await is dropped the join handle stays put for the next call.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // full means a stop is already queued
            let _ = tx.try_send(());
        }
        if let Some(join) = self.join.as_mut() {
            if let Err(e) = join.await {
                error!("{}: worker failed to join: {}", self.name, e);
            }
            self.join = None;
            debug!("{}: worker joined", self.name);
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            join.abort();
        }
    }
}

/// True once a stop was sent or the handle went away.
pub(crate) fn stop_requested(stop_rx: &mut mpsc::Receiver<()>) -> bool {
    !matches!(stop_rx.try_recv(), Err(TryRecvError::Empty))
}

/// Sleep for `period` unless stopped first; returns true when stopped.
pub(crate) async fn nap(stop_rx: &mut mpsc::Receiver<()>, period: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(period) => false,
        _ = stop_rx.recv() => true,
    }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_worker_stops_at_sleep_boundary() {
        let cycles = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&cycles);
        let mut worker = WorkerHandle::spawn("counter", move |mut stop_rx| async move {
            loop {
                if stop_requested(&mut stop_rx) {
                    break;
                }
                counter.fetch_add(1, Ordering::SeqCst);
                if nap(&mut stop_rx, Duration::from_secs(3600)).await {
                    break;
                }
            }
        });

        tokio::task::yield_now().await;
        assert!(worker.is_running());
        worker.stop().await;
        assert!(!worker.is_running());
        let seen = cycles.load(Ordering::SeqCst);
        assert!(seen <= 1);

        // second stop is harmless
        worker.stop().await;
        assert_eq!(cycles.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_interrupted_stop_keeps_the_join() {
        let mut worker = WorkerHandle::spawn("slow", |mut stop_rx| async move {
            let _ = stop_rx.recv().await;
            // winding down takes a while
            tokio::time::sleep(Duration::from_millis(80)).await;
        });

        let cut_short = tokio::time::timeout(Duration::from_millis(10), worker.stop()).await;
        assert!(cut_short.is_err());
        assert!(worker.is_running());

        worker.stop().await;
        assert!(!worker.is_running());
    }
}
