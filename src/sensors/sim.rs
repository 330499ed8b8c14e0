/*
 *  sensors/sim.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Simulated sensors for --simulate runs and scripted ones for tests
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

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{ClimateSensor, Co2Sensor, Gesture, GestureSensor, ReachabilityProbe, SensorError};

/// Slow sine drift around a stuffy-office CO2 level. Every seventh serial
/// read reports not-ready so the PWM fallback gets exercised too.
#[derive(Debug, Default)]
pub struct SimulatedCo2 {
    tick: u32,
}

impl Co2Sensor for SimulatedCo2 {
    fn read_serial(&mut self) -> Result<u16, SensorError> {
        self.tick = self.tick.wrapping_add(1);
        if self.tick % 7 == 0 {
            return Err(SensorError::NotReady);
        }
        Ok(self.level())
    }

    fn read_pwm(&mut self) -> Result<u16, SensorError> {
        Ok(self.level())
    }
}

impl SimulatedCo2 {
    fn level(&self) -> u16 {
        let t = self.tick as f32;
        (950.0 + 550.0 * (t / 40.0).sin() + 15.0 * (t / 3.0).sin()) as u16
    }
}

#[derive(Debug, Default)]
pub struct SimulatedClimate {
    tick: u32,
}

impl ClimateSensor for SimulatedClimate {
    fn read(&mut self) -> Result<(f32, f32), SensorError> {
        self.tick = self.tick.wrapping_add(1);
        let t = self.tick as f32;
        let temperature = 21.5 + 1.5 * (t / 90.0).sin();
        let humidity = 45.0 + 6.0 * (t / 60.0).cos();
        Ok((humidity, temperature))
    }
}

/// Answers in ~12ms, drops one probe in ten.
#[derive(Debug, Default)]
pub struct SimulatedProbe {
    tick: u32,
}

impl ReachabilityProbe for SimulatedProbe {
    fn probe(&mut self, _host: &str) -> Result<Option<Duration>, SensorError> {
        self.tick = self.tick.wrapping_add(1);
        if self.tick % 10 == 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_micros(12_000 + (self.tick % 5) as u64 * 700)))
        }
    }
}

/// One scripted CO2 poll cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Co2Script {
    /// serial read succeeds
    Serial(u16),
    /// serial reports not-ready, PWM answers
    PwmOnly(u16),
    /// both reads fail
    Fail,
}

/// CO2 sensor replaying a script, one step per serial read. Once the
/// script runs out every read fails.
#[derive(Debug)]
pub struct ScriptedCo2 {
    steps: VecDeque<Co2Script>,
    pending_pwm: Option<u16>,
    pwm_reads: Arc<AtomicUsize>,
}

impl ScriptedCo2 {
    pub fn new(steps: impl IntoIterator<Item = Co2Script>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            pending_pwm: None,
            pwm_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of PWM fallback reads, readable after the sensor moved into a task.
    pub fn pwm_reads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.pwm_reads)
    }
}

impl Co2Sensor for ScriptedCo2 {
    fn read_serial(&mut self) -> Result<u16, SensorError> {
        self.pending_pwm = None;
        match self.steps.pop_front() {
            Some(Co2Script::Serial(ppm)) => Ok(ppm),
            Some(Co2Script::PwmOnly(ppm)) => {
                self.pending_pwm = Some(ppm);
                Err(SensorError::NotReady)
            }
            Some(Co2Script::Fail) | None => Err(SensorError::NotReady),
        }
    }

    fn read_pwm(&mut self) -> Result<u16, SensorError> {
        self.pwm_reads.fetch_add(1, Ordering::SeqCst);
        self.pending_pwm.take().ok_or(SensorError::Timeout(Duration::from_millis(2500)))
    }
}

/// Climate sensor replaying (humidity, temperature) pairs; None is a failed read.
#[derive(Debug)]
pub struct ScriptedClimate {
    steps: VecDeque<Option<(f32, f32)>>,
}

impl ScriptedClimate {
    pub fn new(steps: impl IntoIterator<Item = Option<(f32, f32)>>) -> Self {
        Self { steps: steps.into_iter().collect() }
    }
}

impl ClimateSensor for ScriptedClimate {
    fn read(&mut self) -> Result<(f32, f32), SensorError> {
        match self.steps.pop_front() {
            Some(Some(pair)) => Ok(pair),
            Some(None) => Err(SensorError::RetriesExhausted(15)),
            None => Err(SensorError::NoData),
        }
    }
}

/// Probe whose answer the test flips at will.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProbe {
    answer: Arc<Mutex<Option<Duration>>>,
}

impl ScriptedProbe {
    pub fn new(answer: Option<Duration>) -> Self {
        Self { answer: Arc::new(Mutex::new(answer)) }
    }

    pub fn set_answer(&self, answer: Option<Duration>) {
        *self.answer.lock().unwrap_or_else(PoisonError::into_inner) = answer;
    }
}

impl ReachabilityProbe for ScriptedProbe {
    fn probe(&mut self, _host: &str) -> Result<Option<Duration>, SensorError> {
        Ok(*self.answer.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Gesture sensor replaying swipes, then reporting nothing.
#[derive(Debug, Default)]
pub struct ScriptedGesture {
    steps: VecDeque<Gesture>,
}

impl ScriptedGesture {
    pub fn new(steps: impl IntoIterator<Item = Gesture>) -> Self {
        Self { steps: steps.into_iter().collect() }
    }
}

impl GestureSensor for ScriptedGesture {
    fn poll(&mut self) -> Result<Gesture, SensorError> {
        Ok(self.steps.pop_front().unwrap_or(Gesture::None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_co2_falls_back_every_seventh_read() {
        let mut co2 = SimulatedCo2::default();
        let results: Vec<bool> = (0..14).map(|_| co2.read_serial().is_ok()).collect();
        assert!(!results[6] && !results[13]);
        assert_eq!(results.iter().filter(|ok| **ok).count(), 12);
        assert!(co2.read_pwm().unwrap() > 300);
    }

    #[test]
    fn test_scripted_co2_pwm_only_answers_once() {
        let mut co2 = ScriptedCo2::new([Co2Script::PwmOnly(950)]);
        let counter = co2.pwm_reads();
        assert!(matches!(co2.read_serial(), Err(SensorError::NotReady)));
        assert_eq!(co2.read_pwm().unwrap(), 950);
        assert!(co2.read_pwm().is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
