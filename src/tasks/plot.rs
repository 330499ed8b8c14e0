/*
 *  tasks/plot.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Trend plot worker - renders off the render loop, hands over behind a gate
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

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, info};

use super::{lock, nap, stop_requested, TaskView, WorkerHandle};
use crate::chart::TrendChart;
use crate::func_timer::FunctionTimer;
use crate::vframebuf::Raster;

/// The gated "current plot" slot. Whole bitmaps go in and out; the lock is
/// held for the swap or the clone and nothing else.
pub type PlotSlot = Arc<Mutex<Option<Arc<Raster>>>>;

pub struct PlotRenderTask {
    source: TaskView,
    interval: Duration,
    chart: TrendChart,
    slot: PlotSlot,
    worker: Option<WorkerHandle>,
}

impl PlotRenderTask {
    pub fn new(source: TaskView, interval: Duration, chart: TrendChart) -> Self {
        Self {
            source,
            interval,
            chart,
            slot: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Start rendering. A no-op while already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let name = format!("plot {}", self.source.name());
        let source = self.source.clone();
        let chart = self.chart.clone();
        let slot = Arc::clone(&self.slot);
        let interval = self.interval;

        info!("{name}: starting");
        let label = name.clone();
        self.worker = Some(WorkerHandle::spawn(&label, move |mut stop_rx| async move {
            loop {
                if stop_requested(&mut stop_rx) {
                    break;
                }
                let history = source.history();
                let chart = chart.clone();
                let rendered = tokio::task::spawn_blocking(move || {
                    let _t = FunctionTimer::new("plot render");
                    chart.render(&history)
                })
                .await;
                match rendered {
                    Ok(raster) => {
                        // rasterized above, only the swap happens under the gate
                        let raster = Arc::new(raster);
                        *lock(&slot) = Some(raster);
                    }
                    Err(e) => error!("{name}: render panicked: {e}"),
                }
                if nap(&mut stop_rx, interval).await {
                    break;
                }
            }
            debug!("{name}: loop exited");
        }));
    }

    /// Cancel and join. Once this returns the slot will not be written again.
    /// The handle is released only after the join; a stop cut short leaves it
    /// for the next call.
    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.as_mut() {
            worker.stop().await;
            self.worker = None;
            info!("plot {}: stopped", self.source.name());
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(WorkerHandle::is_running)
    }

    /// Latest bitmap, None until the first render lands.
    pub fn current(&self) -> Option<Arc<Raster>> {
        lock(&self.slot).clone()
    }

    pub fn slot(&self) -> PlotSlot {
        Arc::clone(&self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{Reading, TaskSettings};

    fn view(samples: &[f32]) -> (tokio::sync::watch::Sender<Reading>, TaskView) {
        let settings = TaskSettings::new("CO2", Duration::from_secs(5));
        let reading = Reading { latest: samples.last().copied(), revision: 1, history: samples.into() };
        TaskView::channel(&settings, reading)
    }

    async fn first_plot(plot: &PlotRenderTask) -> Option<Arc<Raster>> {
        for _ in 0..400 {
            if let Some(p) = plot.current() {
                return Some(p);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_stop_joins() {
        let (_tx, view) = view(&[800.0, 820.0, 900.0]);
        let mut plot = PlotRenderTask::new(view, Duration::from_millis(10), TrendChart::default());
        assert!(plot.current().is_none());

        plot.start();
        plot.start();
        assert!(plot.is_running());
        assert!(first_plot(&plot).await.is_some());

        plot.stop().await;
        assert!(!plot.is_running());
        let last = plot.current().unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        // nothing written after a confirmed stop
        assert!(Arc::ptr_eq(&last, &plot.current().unwrap()));

        plot.stop().await;
        plot.start();
        assert!(plot.is_running());
        plot.stop().await;
    }

    #[tokio::test]
    async fn test_readers_keep_whole_bitmaps() {
        let (tx, view) = view(&[1.0, 2.0]);
        let mut plot = PlotRenderTask::new(view, Duration::from_millis(5), TrendChart::default());
        plot.start();
        let held = first_plot(&plot).await.unwrap();
        let before = held.as_slice().to_vec();

        tx.send_replace(Reading { latest: Some(9.0), revision: 2, history: vec![9.0, 1.0, 5.0].into() });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // a held reference is never mutated by later renders
        assert_eq!(held.as_slice(), &before[..]);
        plot.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reader_sees_whole_bitmaps_across_start_stop() {
        use crate::constants::{PLOT_HEIGHT, PLOT_WIDTH};
        use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

        let (tx, view) = view(&[400.0, 900.0, 650.0]);
        let mut plot = PlotRenderTask::new(view, Duration::from_millis(1), TrendChart::default());
        let slot = plot.slot();
        let done = Arc::new(AtomicBool::new(false));
        let seen = Arc::new(AtomicUsize::new(0));

        let reader = {
            let (done, seen) = (Arc::clone(&done), Arc::clone(&seen));
            tokio::spawn(async move {
                while !done.load(Ordering::SeqCst) {
                    let current = lock(&slot).clone();
                    if let Some(bitmap) = current {
                        assert_eq!(bitmap.width(), PLOT_WIDTH as usize);
                        assert_eq!(bitmap.height(), PLOT_HEIGHT as usize);
                        assert_eq!(bitmap.as_slice().len(), bitmap.width() * bitmap.height());
                        seen.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for i in 0..8u8 {
            tx.send_replace(Reading {
                latest: Some(500.0 + f32::from(i)),
                revision: i + 2,
                history: vec![500.0 + f32::from(i); usize::from(i) + 1].into(),
            });
            plot.start();
            tokio::time::sleep(Duration::from_millis(5)).await;
            if let Some(bitmap) = plot.current() {
                assert_eq!(bitmap.as_slice().len(), bitmap.width() * bitmap.height());
            }
            plot.stop().await;
            assert!(!plot.is_running());
        }

        done.store(true, Ordering::SeqCst);
        reader.await.unwrap();
        assert!(plot.current().is_some());
        assert!(seen.load(Ordering::SeqCst) > 0);
    }
}
