/*
 *  tasks/sources.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  The four sample sources - CO2, temperature, humidity, ping
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

use log::debug;

use super::climate::ClimateReader;
use super::sensor_task::SampleSource;
use crate::constants::UNREACHABLE_RTT_MS;
use crate::sensors::{Co2Sensor, ReachabilityProbe, SensorError};

/// Serial read first, PWM within the same cycle when serial fails.
pub struct Co2Source {
    sensor: Box<dyn Co2Sensor>,
}

impl Co2Source {
    pub fn new(sensor: impl Co2Sensor + 'static) -> Self {
        Self { sensor: Box::new(sensor) }
    }
}

impl SampleSource for Co2Source {
    fn sample(&mut self) -> Result<f32, SensorError> {
        match self.sensor.read_serial() {
            Ok(ppm) => Ok(ppm as f32),
            Err(e) => {
                debug!("co2 serial read failed ({e}), falling back to PWM");
                self.sensor.read_pwm().map(|ppm| ppm as f32)
            }
        }
    }
}

/// Temperature half of the shared climate reading. Each hub read is
/// sampled once; until the hub reads again there is no new sample.
pub struct TemperatureSource {
    hub: ClimateReader,
    last_seq: u64,
}

impl TemperatureSource {
    pub fn new(hub: ClimateReader) -> Self {
        Self { hub, last_seq: 0 }
    }
}

impl SampleSource for TemperatureSource {
    fn sample(&mut self) -> Result<f32, SensorError> {
        self.hub
            .read_newer(&mut self.last_seq)
            .and_then(|r| r.temperature)
            .ok_or(SensorError::NoData)
    }
}

/// Humidity half of the shared climate reading, consumed like the temperature.
pub struct HumiditySource {
    hub: ClimateReader,
    last_seq: u64,
}

impl HumiditySource {
    pub fn new(hub: ClimateReader) -> Self {
        Self { hub, last_seq: 0 }
    }
}

impl SampleSource for HumiditySource {
    fn sample(&mut self) -> Result<f32, SensorError> {
        self.hub
            .read_newer(&mut self.last_seq)
            .and_then(|r| r.humidity)
            .ok_or(SensorError::NoData)
    }
}

/// Round-trip time in ms, or [`UNREACHABLE_RTT_MS`] when the host is silent.
pub struct PingSource {
    probe: Box<dyn ReachabilityProbe>,
    host: String,
}

impl PingSource {
    pub fn new(probe: impl ReachabilityProbe + 'static, host: &str) -> Self {
        Self { probe: Box::new(probe), host: host.to_string() }
    }
}

impl SampleSource for PingSource {
    fn sample(&mut self) -> Result<f32, SensorError> {
        Ok(match self.probe.probe(&self.host)? {
            Some(rtt) => rtt.as_secs_f32() * 1000.0,
            None => UNREACHABLE_RTT_MS,
        })
    }
}
