/*
 *  display/palette.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Panel colors and the CO2 status bands
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

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;

use crate::constants::{CO2_CAUTION_PPM, CO2_WARNING_PPM};

const fn rgb(r: u8, g: u8, b: u8) -> Rgb565 {
    // 8 bit per channel down to 5/6/5
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

pub const BLACK: Rgb565 = Rgb565::BLACK;
pub const WHITE: Rgb565 = Rgb565::WHITE;

pub const SAFE: Rgb565 = rgb(95, 255, 66);
pub const CAUTION: Rgb565 = rgb(255, 238, 56);
pub const WARNING: Rgb565 = rgb(255, 69, 56);

/// Readout color for a value that changed since the last frame.
pub const FRESH: Rgb565 = rgb(252, 255, 150);
/// Readout color when nothing new arrived.
pub const STALE: Rgb565 = WHITE;

pub const REACHABLE: Rgb565 = rgb(0, 200, 0);
pub const UNREACHABLE: Rgb565 = rgb(220, 0, 0);
/// No probe result yet.
pub const UNKNOWN: Rgb565 = rgb(96, 96, 96);

pub const PLOT_BG: Rgb565 = BLACK;
pub const PLOT_AXIS: Rgb565 = rgb(80, 80, 80);
pub const PLOT_RAW: Rgb565 = WHITE;
pub const PLOT_OVERLAY: Rgb565 = rgb(255, 140, 0);
pub const PLOT_LABEL: Rgb565 = rgb(170, 170, 170);

/// Where a CO2 level sits against the indoor air guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Co2Band {
    Safe,
    Caution,
    Warning,
}

impl Co2Band {
    pub fn color(self) -> Rgb565 {
        match self {
            Co2Band::Safe => SAFE,
            Co2Band::Caution => CAUTION,
            Co2Band::Warning => WARNING,
        }
    }
}

/// `< 1000` safe, `1000..1400` caution, `>= 1400` warning.
pub fn co2_band(ppm: f32) -> Co2Band {
    if ppm >= CO2_WARNING_PPM {
        Co2Band::Warning
    } else if ppm >= CO2_CAUTION_PPM {
        Co2Band::Caution
    } else {
        Co2Band::Safe
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Unknown,
    Reachable,
    Unreachable,
}

impl Reachability {
    /// Classify a published ping value; negative round trips mean no answer.
    pub fn from_rtt(rtt_ms: Option<f32>) -> Self {
        match rtt_ms {
            None => Reachability::Unknown,
            Some(ms) if ms < 0.0 => Reachability::Unreachable,
            Some(_) => Reachability::Reachable,
        }
    }

    pub fn color(self) -> Rgb565 {
        match self {
            Reachability::Unknown => UNKNOWN,
            Reachability::Reachable => REACHABLE,
            Reachability::Unreachable => UNREACHABLE,
        }
    }
}
