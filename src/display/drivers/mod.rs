/*
 *  display/drivers/mod.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display driver implementations
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

// Headless driver, optionally dumping frames to disk
pub mod headless;

// Mock driver for testing
pub mod mock;

// Any embedded-graphics target as a panel; the ST7789 builder is feature gated
pub mod panel;

pub use headless::HeadlessDriver;
pub use mock::{MockDriver, MockDriverState};
pub use panel::PanelDriver;
