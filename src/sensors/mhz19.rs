/*
 *  sensors/mhz19.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  MH-Z19 NDIR CO2 sensor - UART command protocol with PWM fallback
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

use super::SensorError;

/// "Read CO2 concentration" command frame.
pub const READ_CO2: [u8; 9] = [0xFF, 0x01, 0x86, 0x00, 0x00, 0x00, 0x00, 0x00, 0x79];
const RESPONSE_START: u8 = 0xFF;
const RESPONSE_CMD: u8 = 0x86;

/// Detection range the PWM output is scaled to.
pub const DEFAULT_PWM_SPAN_PPM: u32 = 5000;
/// Nominal PWM cycle is 1004ms; allow one and a half cycles to find edges.
pub const PWM_TIMEOUT: Duration = Duration::from_millis(2500);

/// Frame checksum: two's complement of the sum of bytes 1..=7.
pub fn checksum(frame: &[u8; 9]) -> u8 {
    let sum = frame[1..8].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    (!sum).wrapping_add(1)
}

/// Decode a read-CO2 response into ppm.
pub fn parse_response(frame: &[u8; 9]) -> Result<u16, SensorError> {
    if frame[0] != RESPONSE_START || frame[1] != RESPONSE_CMD {
        return Err(SensorError::Malformed(format!(
            "unexpected header {:02x} {:02x}", frame[0], frame[1]
        )));
    }
    let expected = checksum(frame);
    if frame[8] != expected {
        return Err(SensorError::Checksum { got: frame[8], expected });
    }
    Ok(u16::from_be_bytes([frame[2], frame[3]]))
}

/// ppm from one PWM cycle: span * (Th - 2ms) / (Th + Tl - 4ms).
pub fn pwm_ppm(high: Duration, low: Duration, span_ppm: u32) -> Result<u16, SensorError> {
    let th = high.as_secs_f64() * 1000.0;
    let tl = low.as_secs_f64() * 1000.0;
    let cycle = th + tl - 4.0;
    if cycle <= 0.0 || th < 2.0 {
        return Err(SensorError::Malformed(format!("implausible duty cycle {th:.1}/{tl:.1}ms")));
    }
    let ppm = span_ppm as f64 * (th - 2.0) / cycle;
    Ok(ppm.round().clamp(0.0, u16::MAX as f64) as u16)
}

#[cfg(feature = "hardware")]
pub use hw::Mhz19;

#[cfg(feature = "hardware")]
mod hw {
    use std::thread;
    use std::time::{Duration, Instant};

    use rppal::gpio::{Gpio, InputPin, Level};
    use rppal::uart::{Parity, Queue, Uart};

    use super::{parse_response, pwm_ppm, PWM_TIMEOUT, READ_CO2};
    use crate::sensors::{Co2Sensor, SensorError};

    const BAUD: u32 = 9600;
    const SERIAL_TIMEOUT: Duration = Duration::from_secs(1);
    const PWM_POLL: Duration = Duration::from_micros(250);

    /// MH-Z19 wired to the Pi UART plus its PWM pin on a GPIO.
    pub struct Mhz19 {
        uart: Uart,
        pwm: InputPin,
        span_ppm: u32,
    }

    fn hw_err(e: impl std::fmt::Display) -> SensorError {
        SensorError::Hardware(e.to_string())
    }

    impl Mhz19 {
        pub fn open(serial_port: &str, pwm_pin: u8, span_ppm: u32) -> Result<Self, SensorError> {
            let mut uart = Uart::with_path(serial_port, BAUD, Parity::None, 8, 1).map_err(hw_err)?;
            uart.set_read_mode(READ_CO2.len() as u8, SERIAL_TIMEOUT).map_err(hw_err)?;
            let pwm = Gpio::new().map_err(hw_err)?.get(pwm_pin).map_err(hw_err)?.into_input();
            Ok(Self { uart, pwm, span_ppm })
        }

        fn wait_for(&self, level: Level, deadline: Instant) -> Result<Instant, SensorError> {
            loop {
                if self.pwm.read() == level {
                    return Ok(Instant::now());
                }
                if Instant::now() >= deadline {
                    return Err(SensorError::Timeout(PWM_TIMEOUT));
                }
                thread::sleep(PWM_POLL);
            }
        }
    }

    impl Co2Sensor for Mhz19 {
        fn read_serial(&mut self) -> Result<u16, SensorError> {
            self.uart.flush(Queue::Input).map_err(hw_err)?;
            self.uart.write(&READ_CO2).map_err(hw_err)?;
            let mut frame = [0u8; 9];
            let n = self.uart.read(&mut frame).map_err(hw_err)?;
            if n < frame.len() {
                return Err(SensorError::NotReady);
            }
            parse_response(&frame)
        }

        fn read_pwm(&mut self) -> Result<u16, SensorError> {
            let deadline = Instant::now() + PWM_TIMEOUT;
            // align on a full cycle: low -> rise -> fall -> rise
            self.wait_for(Level::Low, deadline)?;
            let rise = self.wait_for(Level::High, deadline)?;
            let fall = self.wait_for(Level::Low, deadline)?;
            let next_rise = self.wait_for(Level::High, deadline)?;
            pwm_ppm(fall - rise, next_rise - fall, self.span_ppm)
        }
    }
}
