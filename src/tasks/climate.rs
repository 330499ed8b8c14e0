/*
 *  tasks/climate.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  One DHT22 poll loop shared by the temperature and humidity tasks
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

use log::{error, info, warn};
use tokio::sync::watch;

use super::{lock, nap, stop_requested, WorkerHandle};
use crate::sensors::ClimateSensor;

/// Last joint reading; None until the sensor first answers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClimateReading {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    /// bumped once per successful sensor read, 0 before the first
    pub seq: u64,
}

/// Reads the hub's last pair; never touches the sensor.
#[derive(Debug, Clone)]
pub struct ClimateReader {
    rx: watch::Receiver<ClimateReading>,
}

impl ClimateReader {
    /// A reader plus the sender feeding it, starting at "no data".
    pub fn channel() -> (watch::Sender<ClimateReading>, Self) {
        let (tx, rx) = watch::channel(ClimateReading::default());
        (tx, Self { rx })
    }

    pub fn read(&self) -> ClimateReading {
        *self.rx.borrow()
    }

    /// The current pair if it arrived after `last_seq`, moving `last_seq` on.
    pub fn read_newer(&self, last_seq: &mut u64) -> Option<ClimateReading> {
        let reading = self.read();
        if reading.seq == *last_seq {
            return None;
        }
        *last_seq = reading.seq;
        Some(reading)
    }
}

pub struct ClimateHub {
    reader: ClimateReader,
    worker: WorkerHandle,
}

impl ClimateHub {
    pub fn spawn(sensor: impl ClimateSensor + 'static, interval: Duration) -> Self {
        let (tx, reader) = ClimateReader::channel();
        let sensor: Arc<Mutex<Box<dyn ClimateSensor>>> = Arc::new(Mutex::new(Box::new(sensor)));

        let worker = WorkerHandle::spawn("climate", move |mut stop_rx| async move {
            info!("climate: polling every {interval:?}");
            let mut seq = 0u64;
            loop {
                if stop_requested(&mut stop_rx) {
                    break;
                }
                let sensor = Arc::clone(&sensor);
                match tokio::task::spawn_blocking(move || lock(&sensor).read()).await {
                    Ok(Ok((humidity, temperature))) if humidity.is_finite() && temperature.is_finite() => {
                        // both halves land in one send, readers never see a torn pair
                        seq += 1;
                        tx.send_replace(ClimateReading {
                            temperature: Some(temperature),
                            humidity: Some(humidity),
                            seq,
                        });
                    }
                    Ok(Ok((humidity, temperature))) => {
                        warn!("climate: discarding non-finite pair {humidity}/{temperature}");
                    }
                    Ok(Err(e)) => warn!("climate: no reading this cycle: {e}"),
                    Err(e) => error!("climate: poll cycle panicked: {e}"),
                }
                if nap(&mut stop_rx, interval).await {
                    break;
                }
            }
            info!("climate: stopped");
        });

        Self { reader, worker }
    }

    pub fn reader(&self) -> ClimateReader {
        self.reader.clone()
    }

    pub fn read(&self) -> ClimateReading {
        self.reader.read()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    pub async fn stop(&mut self) {
        self.worker.stop().await;
    }
}
