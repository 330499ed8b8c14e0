/*
 *  display/drivers/panel.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Physical panel driver - pushes whole RGB565 frames to a draw target
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

use std::fmt::Debug;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::display::error::DisplayError;
use crate::display::traits::{check_frame, DisplayCapabilities, DisplayDriver};
use crate::vframebuf::Raster;

/// Any RGB565 draw target treated as the panel. One `fill_contiguous`
/// per frame lets controller drivers stream the window in one go.
pub struct PanelDriver<D> {
    target: D,
    capabilities: DisplayCapabilities,
}

impl<D> PanelDriver<D>
where
    D: DrawTarget<Color = Rgb565> + OriginDimensions + Send,
    D::Error: Debug,
{
    pub fn new(target: D, max_fps: u32) -> Self {
        let size = target.size();
        Self {
            target,
            capabilities: DisplayCapabilities {
                width: size.width,
                height: size.height,
                max_fps,
                supports_backlight: false,
            },
        }
    }

    pub fn target(&self) -> &D {
        &self.target
    }
}

impl<D> DisplayDriver for PanelDriver<D>
where
    D: DrawTarget<Color = Rgb565> + OriginDimensions + Send,
    D::Error: Debug,
{
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        // controller init happens when the target is built
        self.target
            .clear(Rgb565::BLACK)
            .map_err(|e| DisplayError::InitializationFailed(format!("{:?}", e)))
    }

    fn push_frame(&mut self, frame: &Raster) -> Result<(), DisplayError> {
        check_frame(&self.capabilities, frame)?;
        let area = Rectangle::new(
            Point::zero(),
            Size::new(self.capabilities.width, self.capabilities.height),
        );
        self.target
            .fill_contiguous(&area, frame.as_slice().iter().copied())
            .map_err(|e| DisplayError::SpiError(format!("{:?}", e)))
    }
}

#[cfg(feature = "driver-st7789")]
pub use st7789::{open_st7789, St7789Panel};

#[cfg(feature = "driver-st7789")]
mod st7789 {
    use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
    use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
    use linux_embedded_hal::{CdevPin, Delay, SpidevDevice};
    use log::info;
    use mipidsi::interface::SpiInterface;
    use mipidsi::models::ST7789;
    use mipidsi::options::{ColorInversion, Orientation, Rotation};
    use mipidsi::{Builder, Display};

    use super::PanelDriver;
    use crate::config::DisplayConfig;
    use crate::display::error::DisplayError;

    // bytes batched per SPI transfer
    const SPI_BUFFER: usize = 4096;

    pub type St7789Panel = PanelDriver<Display<SpiInterface<'static, SpidevDevice, CdevPin>, ST7789, CdevPin>>;

    fn output_pin(chip: &mut Chip, line: u32, label: &str) -> Result<CdevPin, DisplayError> {
        let handle = chip
            .get_line(line)
            .and_then(|l| l.request(LineRequestFlags::OUTPUT, 0, label))
            .map_err(|e| DisplayError::GpioError(format!("line {}: {:?}", line, e)))?;
        CdevPin::new(handle).map_err(|e| DisplayError::GpioError(format!("line {}: {:?}", line, e)))
    }

    fn rotation(degrees: u16) -> Rotation {
        match degrees {
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    /// ST7789 240x240 on spidev with DC and reset on the GPIO character device.
    pub fn open_st7789(config: &DisplayConfig) -> Result<St7789Panel, DisplayError> {
        let mut spi = SpidevDevice::open(&config.spi_bus)
            .map_err(|e| DisplayError::SpiError(format!("{}: {:?}", config.spi_bus, e)))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(config.speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| DisplayError::SpiError(format!("configure: {:?}", e)))?;

        let mut chip = Chip::new(&config.gpio_chip)
            .map_err(|e| DisplayError::GpioError(format!("{}: {:?}", config.gpio_chip, e)))?;
        let dc = output_pin(&mut chip, config.dc_pin, "airmons-dc")?;
        let rst = output_pin(&mut chip, config.rst_pin, "airmons-rst")?;

        // lives as long as the panel, which is the whole process
        let buffer: &'static mut [u8] = Box::leak(Box::new([0u8; SPI_BUFFER]));
        let di = SpiInterface::new(spi, dc, buffer);

        let display = Builder::new(ST7789, di)
            .display_size(config.width as u16, config.height as u16)
            .display_offset(config.offset_x, config.offset_y)
            .orientation(Orientation::new().rotate(rotation(config.rotate_deg)))
            .invert_colors(ColorInversion::Inverted)
            .reset_pin(rst)
            .init(&mut Delay)
            .map_err(|e| DisplayError::InitializationFailed(format!("{:?}", e)))?;

        info!("ST7789 {}x{} on {} at {}Hz", config.width, config.height, config.spi_bus, config.speed_hz);
        Ok(PanelDriver::new(display, config.max_fps))
    }
}
