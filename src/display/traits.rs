/*
 *  display/traits.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for display driver abstraction
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

use crate::display::error::DisplayError;
use crate::vframebuf::Raster;

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Maximum recommended frame rate, 0 when the driver does not care
    pub max_fps: u32,

    /// Whether the backlight can be switched
    pub supports_backlight: bool,
}

/// Minimal hardware abstraction - every panel backend implements this
///
/// Pages compose a full RGB565 raster in memory; the driver only ever
/// receives finished frames.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the display hardware
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Transfer a whole frame to the panel
    ///
    /// The raster must match the display dimensions.
    fn push_frame(&mut self, frame: &Raster) -> Result<(), DisplayError>;

    /// Switch the backlight (if supported)
    fn set_backlight(&mut self, _on: bool) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }
}

/// Size check shared by the drivers.
pub(crate) fn check_frame(caps: &DisplayCapabilities, frame: &Raster) -> Result<(), DisplayError> {
    let expected = (caps.width * caps.height) as usize;
    let actual = frame.as_slice().len();
    if frame.width() != caps.width as usize || actual != expected {
        return Err(DisplayError::BufferSizeMismatch { expected, actual });
    }
    Ok(())
}
