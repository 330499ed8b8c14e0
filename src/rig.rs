/*
 *  rig.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Rig - the sensors and panel this process runs against
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

use std::time::Duration;

use log::info;
use thiserror::Error;

use crate::config::{Config, DisplayConfig, DriverKind, GestureSource};
use crate::display::{DisplayDriver, DisplayError, HeadlessDriver};
use crate::sensors::dht::IioDht;
use crate::sensors::gesture::{LineGesture, NoGesture};
use crate::sensors::ping::SystemPing;
use crate::sensors::sim::{SimulatedClimate, SimulatedCo2, SimulatedProbe};
use crate::sensors::{ClimateSensor, Co2Sensor, GestureSensor, ReachabilityProbe, SensorError};

/// Missing hardware at startup. Fatal; nothing is retried.
#[derive(Debug, Error)]
pub enum RigError {
    #[error("CO2 sensor unavailable: {0}")]
    Co2(#[source] SensorError),
    #[error("climate sensor unavailable: {0}")]
    Climate(#[source] std::io::Error),
    #[error("display unavailable: {0}")]
    Display(#[from] DisplayError),
    #[error("{0} support not built, enable feature `{1}`")]
    NotBuilt(&'static str, &'static str),
}

/// Every device handle, built once and handed to the tasks that own them.
pub struct Rig {
    pub co2: Box<dyn Co2Sensor>,
    pub climate: Box<dyn ClimateSensor>,
    pub probe: Option<Box<dyn ReachabilityProbe>>,
    pub gesture: Box<dyn GestureSensor>,
}

impl Rig {
    pub fn from_config(cfg: &Config) -> Result<Self, RigError> {
        let (co2, climate, probe) = if cfg.simulate {
            info!("using simulated sensors");
            let co2: Box<dyn Co2Sensor> = Box::new(SimulatedCo2::default());
            let climate: Box<dyn ClimateSensor> = Box::new(SimulatedClimate::default());
            let probe: Box<dyn ReachabilityProbe> = Box::new(SimulatedProbe::default());
            (co2, climate, probe)
        } else {
            let co2 = open_co2(cfg)?;
            let climate = IioDht::open(
                &cfg.climate.iio_device,
                cfg.climate.retries,
                Duration::from_millis(cfg.climate.retry_delay_ms),
            )
            .map_err(RigError::Climate)?;
            info!("DHT22 on {}", cfg.climate.iio_device.display());
            let timeout = Duration::from_secs(cfg.ping.as_ref().map_or(2, |p| p.timeout_secs));
            let probe: Box<dyn ReachabilityProbe> = Box::new(SystemPing::new(timeout));
            (co2, Box::new(climate) as Box<dyn ClimateSensor>, probe)
        };

        let gesture: Box<dyn GestureSensor> = match cfg.gesture.source {
            GestureSource::Stdin => {
                info!("gestures from stdin (u/d/l/r)");
                Box::new(LineGesture::stdin())
            }
            GestureSource::None => Box::new(NoGesture),
        };

        Ok(Self {
            co2,
            climate,
            probe: cfg.ping.as_ref().map(|_| probe),
            gesture,
        })
    }
}

#[cfg(feature = "hardware")]
fn open_co2(cfg: &Config) -> Result<Box<dyn Co2Sensor>, RigError> {
    use crate::sensors::mhz19::Mhz19;
    let sensor = Mhz19::open(&cfg.co2.serial_port, cfg.co2.pwm_pin, cfg.co2.pwm_span_ppm).map_err(RigError::Co2)?;
    info!("MH-Z19 on {}, PWM on GPIO{}", cfg.co2.serial_port, cfg.co2.pwm_pin);
    Ok(Box::new(sensor))
}

#[cfg(not(feature = "hardware"))]
fn open_co2(_cfg: &Config) -> Result<Box<dyn Co2Sensor>, RigError> {
    Err(RigError::NotBuilt("MH-Z19", "hardware"))
}

/// Panel selected by the config, initialised by the orchestrator.
pub fn open_display(cfg: &DisplayConfig) -> Result<Box<dyn DisplayDriver>, RigError> {
    match cfg.driver {
        DriverKind::Headless => Ok(Box::new(HeadlessDriver::new(cfg.width, cfg.height, cfg.snapshot_path.clone()))),
        DriverKind::St7789 => open_st7789(cfg),
    }
}

#[cfg(feature = "driver-st7789")]
fn open_st7789(cfg: &DisplayConfig) -> Result<Box<dyn DisplayDriver>, RigError> {
    Ok(Box::new(crate::display::drivers::panel::open_st7789(cfg)?))
}

#[cfg(not(feature = "driver-st7789"))]
fn open_st7789(_cfg: &DisplayConfig) -> Result<Box<dyn DisplayDriver>, RigError> {
    Err(RigError::NotBuilt("ST7789", "driver-st7789"))
}
