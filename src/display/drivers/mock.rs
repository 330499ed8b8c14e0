/*
 *  display/drivers/mock.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock display driver for testing without hardware
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
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_graphics::pixelcolor::Rgb565;

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::display::error::DisplayError;
use crate::display::traits::{check_frame, DisplayCapabilities, DisplayDriver};
use crate::vframebuf::Raster;

/// Frames kept for inspection.
const KEEP_FRAMES: usize = 8;

/// Mock display driver for testing
///
/// Records every pushed frame (the most recent few in full) so tests can
/// check what reached the panel and in which order.
#[derive(Debug, Clone)]
pub struct MockDriver {
    /// Display capabilities
    capabilities: DisplayCapabilities,

    /// Shared state for testing
    state: Arc<Mutex<MockDriverState>>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Number of frames pushed
    pub frame_count: usize,

    /// Most recent frames, oldest first
    pub frames: VecDeque<Raster>,

    /// Last backlight state set
    pub backlight: Option<bool>,

    /// Whether the driver is initialized
    pub is_initialized: bool,

    /// Simulate failures (for error testing)
    pub simulate_push_failure: bool,
    pub simulate_init_failure: bool,
}

impl MockDriverState {
    pub fn last_frame(&self) -> Option<&Raster> {
        self.frames.back()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new_with_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }
}

impl MockDriver {
    /// Create a mock driver with specific dimensions
    pub fn new_with_size(width: u32, height: u32) -> Self {
        let capabilities = DisplayCapabilities {
            width,
            height,
            max_fps: 0,
            supports_backlight: true,
        };
        Self {
            capabilities,
            state: Arc::new(Mutex::new(MockDriverState::default())),
        }
    }

    /// A panel whose backlight cannot be switched
    pub fn without_backlight(mut self) -> Self {
        self.capabilities.supports_backlight = false;
        self
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> MutexGuard<'_, MockDriverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn frame_count(&self) -> usize {
        self.lock().frame_count
    }

    /// Pixel of the last pushed frame
    pub fn last_pixel(&self, x: i32, y: i32) -> Option<Rgb565> {
        self.lock().last_frame().and_then(|f| f.pixel(x, y))
    }

    /// Whether the last pushed frame was entirely one color
    pub fn last_frame_is(&self, color: Rgb565) -> bool {
        self.lock()
            .last_frame()
            .is_some_and(|f| f.as_slice().iter().all(|c| *c == color))
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();

        if state.simulate_init_failure {
            return Err(DisplayError::InitializationFailed("Simulated init failure".to_string()));
        }

        state.init_count += 1;
        state.is_initialized = true;
        Ok(())
    }

    fn push_frame(&mut self, frame: &Raster) -> Result<(), DisplayError> {
        check_frame(&self.capabilities, frame)?;
        let mut state = self.lock();

        if state.simulate_push_failure {
            return Err(DisplayError::SpiError("Simulated push failure".to_string()));
        }

        state.frame_count += 1;
        if state.frames.len() == KEEP_FRAMES {
            state.frames.pop_front();
        }
        state.frames.push_back(frame.clone());
        Ok(())
    }

    fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.lock().backlight = Some(on);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::palette::{BLACK, SAFE};

    #[test]
    fn test_mock_driver_init() {
        let mut driver = MockDriver::default();

        let state = driver.state();
        assert_eq!(state.lock().unwrap().init_count, 0);
        assert!(!state.lock().unwrap().is_initialized);

        driver.init().unwrap();

        assert_eq!(state.lock().unwrap().init_count, 1);
        assert!(state.lock().unwrap().is_initialized);
    }

    #[test]
    fn test_mock_driver_records_frames() {
        let mut driver = MockDriver::new_with_size(16, 16);
        let mut frame = Raster::new(16, 16, BLACK);
        for _ in 0..10 {
            driver.push_frame(&frame).unwrap();
        }
        frame.clear_color(SAFE);
        driver.push_frame(&frame).unwrap();

        assert_eq!(driver.frame_count(), 11);
        assert_eq!(driver.state().lock().unwrap().frames.len(), KEEP_FRAMES);
        assert!(driver.last_frame_is(SAFE));
        assert_eq!(driver.last_pixel(3, 3), Some(SAFE));
    }

    #[test]
    fn test_mock_driver_rejects_wrong_size() {
        let mut driver = MockDriver::new_with_size(16, 16);
        let frame = Raster::new(8, 8, BLACK);
        assert!(matches!(
            driver.push_frame(&frame),
            Err(DisplayError::BufferSizeMismatch { expected: 256, actual: 64 })
        ));
        assert_eq!(driver.frame_count(), 0);
    }

    #[test]
    fn test_mock_driver_push_failure() {
        let mut driver = MockDriver::new_with_size(16, 16);
        driver.state().lock().unwrap().simulate_push_failure = true;
        assert!(driver.push_frame(&Raster::new(16, 16, BLACK)).is_err());
    }
}
