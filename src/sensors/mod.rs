/*
 *  sensors/mod.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Sensor capabilities - the narrow read contracts the tasks poll
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

pub mod dht;
pub mod gesture;
pub mod mhz19;
pub mod ping;
pub mod sim;

use std::time::Duration;
use thiserror::Error;

/// Why a single read produced no sample. Every variant is transient from
/// the poll loop's point of view - the next cycle is the retry.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor not ready")]
    NotReady,
    #[error("no new data")]
    NoData,
    #[error("checksum mismatch (got {got:#04x}, expected {expected:#04x})")]
    Checksum { got: u8, expected: u8 },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("gave up after {0} attempts")]
    RetriesExhausted(u32),
    #[error("non-finite sample {0}")]
    NonFinite(f32),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("hardware error: {0}")]
    Hardware(String),
}

/// NDIR CO2 sensor with a serial protocol and a PWM duty-cycle output.
pub trait Co2Sensor: Send {
    /// Serial read; `NotReady` while the sensor has nothing to say.
    fn read_serial(&mut self) -> Result<u16, SensorError>;

    /// Slower PWM duty-cycle read, used when the serial read fails.
    fn read_pwm(&mut self) -> Result<u16, SensorError>;
}

/// Combined temperature/humidity sensor (DHT22).
pub trait ClimateSensor: Send {
    /// (humidity %, temperature °C), after the sensor's own retry window.
    fn read(&mut self) -> Result<(f32, f32), SensorError>;
}

/// Network reachability check.
pub trait ReachabilityProbe: Send {
    /// Round-trip time, or None when the host did not answer.
    fn probe(&mut self, host: &str) -> Result<Option<Duration>, SensorError>;
}

/// Swipe directions reported by the gesture sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Up,
    Down,
    Left,
    Right,
    None,
}

/// Gesture sensor, polled frequently; `Gesture::None` when nothing happened.
pub trait GestureSensor: Send {
    fn poll(&mut self) -> Result<Gesture, SensorError>;
}

// boxed sensors, as handed out by the rig
impl<T: Co2Sensor + ?Sized> Co2Sensor for Box<T> {
    fn read_serial(&mut self) -> Result<u16, SensorError> {
        (**self).read_serial()
    }

    fn read_pwm(&mut self) -> Result<u16, SensorError> {
        (**self).read_pwm()
    }
}

impl<T: ClimateSensor + ?Sized> ClimateSensor for Box<T> {
    fn read(&mut self) -> Result<(f32, f32), SensorError> {
        (**self).read()
    }
}

impl<T: ReachabilityProbe + ?Sized> ReachabilityProbe for Box<T> {
    fn probe(&mut self, host: &str) -> Result<Option<Duration>, SensorError> {
        (**self).probe(host)
    }
}

impl<T: GestureSensor + ?Sized> GestureSensor for Box<T> {
    fn poll(&mut self) -> Result<Gesture, SensorError> {
        (**self).poll()
    }
}
