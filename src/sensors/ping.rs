/*
 *  sensors/ping.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  ICMP reachability through the system ping utility (no raw socket caps needed)
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

use std::process::Command;
use std::time::Duration;

use super::{ReachabilityProbe, SensorError};

#[derive(Debug, Clone)]
pub struct SystemPing {
    timeout: Duration,
}

impl SystemPing {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Pull the `time=12.3 ms` figure out of ping's reply line.
pub fn parse_rtt(output: &str) -> Option<Duration> {
    let start = output.find("time=")? + "time=".len();
    let rest = &output[start..];
    let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
    let ms: f64 = rest[..end].parse().ok()?;
    Some(Duration::from_micros((ms * 1000.0).round() as u64))
}

impl ReachabilityProbe for SystemPing {
    fn probe(&mut self, host: &str) -> Result<Option<Duration>, SensorError> {
        let wait = self.timeout.as_secs().max(1).to_string();
        let output = Command::new("ping")
            .args(["-n", "-c", "1", "-W", wait.as_str(), host])
            .output()?;

        // exit 1 = no reply, anything else non-zero = ping itself failed
        match output.status.code() {
            Some(0) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                parse_rtt(&stdout)
                    .map(Some)
                    .ok_or_else(|| SensorError::Malformed("no rtt in ping reply".into()))
            }
            Some(1) => Ok(None),
            _ => Err(SensorError::Hardware(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }
}
