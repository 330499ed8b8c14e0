/*
 *  sensors/dht.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  DHT22 through the kernel dht11 IIO driver (dtoverlay=dht11,gpiopin=16)
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
//! The kernel does the bit-banging; a read of either channel triggers a
//! conversion and fails with EIO/ETIMEDOUT whenever the sensor misses its
//! timing, which is often. Retries are spaced to respect the 2s minimum
//! sampling period of the DHT22.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::debug;

use super::{ClimateSensor, SensorError};

pub const DEFAULT_IIO_DEVICE: &str = "/sys/bus/iio/devices/iio:device0";
pub const DEFAULT_RETRIES: u32 = 15;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

const TEMP_CHANNEL: &str = "in_temp_input";
const HUMIDITY_CHANNEL: &str = "in_humidityrelative_input";

/// DHT22 read through the IIO sysfs channels.
#[derive(Debug, Clone)]
pub struct IioDht {
    device: PathBuf,
    retries: u32,
    retry_delay: Duration,
}

impl IioDht {
    pub fn new(device: impl Into<PathBuf>, retries: u32, retry_delay: Duration) -> Self {
        Self { device: device.into(), retries: retries.max(1), retry_delay }
    }

    /// Fails when the IIO device is missing entirely (overlay not loaded).
    pub fn open(device: impl Into<PathBuf>, retries: u32, retry_delay: Duration) -> io::Result<Self> {
        let dht = Self::new(device, retries, retry_delay);
        if !dht.device.join(TEMP_CHANNEL).exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no DHT IIO channels under {}", dht.device.display()),
            ));
        }
        Ok(dht)
    }

    fn read_once(&self) -> Result<(f32, f32), SensorError> {
        let temperature = read_milli(&self.device.join(TEMP_CHANNEL))?;
        let humidity = read_milli(&self.device.join(HUMIDITY_CHANNEL))?;
        Ok((humidity, temperature))
    }
}

/// IIO processed channels report milli-units as a decimal integer.
fn read_milli(path: &Path) -> Result<f32, SensorError> {
    let content = fs::read_to_string(path)?;
    let raw = content.trim();
    raw.parse::<i64>()
        .map(|v| v as f32 / 1000.0)
        .map_err(|e| SensorError::Malformed(format!("{}: {raw:?} ({e})", path.display())))
}

impl ClimateSensor for IioDht {
    fn read(&mut self) -> Result<(f32, f32), SensorError> {
        for attempt in 1..=self.retries {
            match self.read_once() {
                Ok(pair) => return Ok(pair),
                Err(e) => {
                    debug!("dht read attempt {attempt}/{} failed: {e}", self.retries);
                    if attempt < self.retries {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }
        Err(SensorError::RetriesExhausted(self.retries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_device(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("airmons-iio-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_reads_milli_units() {
        let dir = fake_device("ok");
        fs::write(dir.join(TEMP_CHANNEL), "21300\n").unwrap();
        fs::write(dir.join(HUMIDITY_CHANNEL), "45600\n").unwrap();

        let mut dht = IioDht::open(&dir, 3, Duration::ZERO).unwrap();
        let (humidity, temperature) = dht.read().unwrap();
        assert!((humidity - 45.6).abs() < 1e-4);
        assert!((temperature - 21.3).abs() < 1e-4);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_retries_then_gives_up() {
        let dir = fake_device("bad");
        fs::write(dir.join(TEMP_CHANNEL), "garbage").unwrap();

        let mut dht = IioDht::new(&dir, 3, Duration::ZERO);
        assert!(matches!(dht.read(), Err(SensorError::RetriesExhausted(3))));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_open_requires_device() {
        let missing = std::env::temp_dir().join("airmons-iio-definitely-missing");
        assert!(IioDht::open(missing, 1, Duration::ZERO).is_err());
    }
}
