/*
 *  main.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Daemon entry point: config, sensors, tasks, display loop, shutdown
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

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use env_logger::Env;
use log::info;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;

use airmons::config;
use airmons::display::{DashboardViews, DisplayOrchestrator, PageController};
use airmons::rig::{open_display, Rig};
use airmons::storage::{BlobStore, FileStore};
use airmons::tasks::{
    ClimateHub, Co2Source, GestureTask, HumiditySource, PingSource, PlotRenderTask, SensorTask, TemperatureSource,
};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP, whichever comes first.
async fn wait_for_signal(mut sigint: Signal, mut sigterm: Signal, mut sighup: Signal) {
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load().context("loading configuration")?;

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} - breathe easy", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    // signals first so a failure here costs nothing
    let sigint = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let sighup = signal(SignalKind::hangup()).context("installing SIGHUP handler")?;

    let dir = cfg.storage_dir();
    let store: Arc<dyn BlobStore> =
        Arc::new(FileStore::open(&dir).with_context(|| format!("opening storage at {}", dir.display()))?);
    info!("series stored under {}", dir.display());

    let rig = Rig::from_config(&cfg).context("opening sensors")?;
    let driver = open_display(&cfg.display).context("opening display")?;

    let mut hub = ClimateHub::spawn(rig.climate, Duration::from_secs(cfg.climate.interval_secs));
    let mut co2 = SensorTask::spawn(cfg.co2_settings(), Co2Source::new(rig.co2), Arc::clone(&store));
    let mut temperature = SensorTask::spawn(
        cfg.temperature_settings(),
        TemperatureSource::new(hub.reader()),
        Arc::clone(&store),
    );
    let mut humidity =
        SensorTask::spawn(cfg.humidity_settings(), HumiditySource::new(hub.reader()), Arc::clone(&store));
    let mut ping = match (cfg.ping_settings(), rig.probe, cfg.ping.as_ref()) {
        (Some(settings), Some(probe), Some(ping)) => {
            info!("pinging {} every {}s", ping.host, ping.interval_secs);
            Some(SensorTask::spawn(settings, PingSource::new(probe, &ping.host), Arc::clone(&store)))
        }
        _ => None,
    };

    let views = DashboardViews {
        co2: co2.view(),
        temperature: temperature.view(),
        humidity: humidity.view(),
        ping: ping.as_ref().map(SensorTask::view),
    };
    let pages = cfg
        .pages
        .iter()
        .map(|&kind| {
            let plot = PlotRenderTask::new(views.view(kind).clone(), cfg.plot.interval(), cfg.plot.chart());
            PageController::dashboard(kind, &views, plot)
        })
        .collect();

    let mut orchestrator = DisplayOrchestrator::new(driver, pages)
        .context("starting display")?
        .with_frame_cap(cfg.display.max_fps)
        .with_disabled_refresh(cfg.display.disabled_refresh());
    let mut gestures = GestureTask::spawn(rig.gesture, cfg.gesture.interval(), orchestrator.commands());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal(sigint, sigterm, sighup).await;
        shutdown_tx.send_replace(true);
    });

    info!("Entering main display loop");
    orchestrator.run(shutdown_rx).await;

    gestures.stop().await;
    co2.stop().await;
    temperature.stop().await;
    humidity.stop().await;
    if let Some(task) = ping.as_mut() {
        task.stop().await;
    }
    hub.stop().await;

    info!("AirMonS stopped");
    Ok(())
}
