/*
 *  display/drivers/headless.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Headless display - no panel, optional periodic PPM snapshot
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

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::display::error::DisplayError;
use crate::display::traits::{check_frame, DisplayCapabilities, DisplayDriver};
use crate::vframebuf::Raster;

/// Minimum spacing between two snapshot writes.
pub const SNAPSHOT_EVERY: Duration = Duration::from_secs(2);

/// Accepts frames and drops them, or writes one to `snapshot` every so often.
#[derive(Debug)]
pub struct HeadlessDriver {
    capabilities: DisplayCapabilities,
    snapshot: Option<PathBuf>,
    every: Duration,
    last_dump: Option<Instant>,
    frames: u64,
}

impl HeadlessDriver {
    pub fn new(width: u32, height: u32, snapshot: Option<PathBuf>) -> Self {
        Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                max_fps: 25,
                supports_backlight: false,
            },
            snapshot,
            every: SNAPSHOT_EVERY,
            last_dump: None,
            frames: 0,
        }
    }

    pub fn with_interval(mut self, every: Duration) -> Self {
        self.every = every;
        self
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn dump(&self, path: &Path, frame: &Raster) -> Result<(), DisplayError> {
        // write aside then rename, viewers never see half a file
        let tmp = path.with_extension("ppm.tmp");
        let mut out = BufWriter::new(File::create(&tmp)?);
        frame.write_ppm(&mut out)?;
        out.flush()?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl DisplayDriver for HeadlessDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        match &self.snapshot {
            Some(path) => info!("headless display, snapshots to {}", path.display()),
            None => info!("headless display, frames discarded"),
        }
        Ok(())
    }

    fn push_frame(&mut self, frame: &Raster) -> Result<(), DisplayError> {
        check_frame(&self.capabilities, frame)?;
        self.frames += 1;

        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let due = self.last_dump.is_none_or(|t| t.elapsed() >= self.every);
        if due {
            self.dump(path, frame)?;
            self.last_dump = Some(Instant::now());
            debug!("snapshot {} written", self.frames);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::palette::SAFE;

    #[test]
    fn test_headless_counts_without_snapshot() {
        let mut driver = HeadlessDriver::new(4, 4, None);
        driver.init().unwrap();
        driver.push_frame(&Raster::new(4, 4, SAFE)).unwrap();
        assert_eq!(driver.frames(), 1);
        assert!(driver.push_frame(&Raster::new(2, 2, SAFE)).is_err());
    }

    #[test]
    fn test_headless_snapshot_rate_limited() {
        let path = std::env::temp_dir().join(format!("airmons-snap-{}.ppm", std::process::id()));
        let _ = fs::remove_file(&path);

        let mut driver = HeadlessDriver::new(4, 4, Some(path.clone())).with_interval(Duration::from_secs(3600));
        driver.push_frame(&Raster::new(4, 4, SAFE)).unwrap();
        let first = fs::metadata(&path).unwrap().modified().unwrap();
        driver.push_frame(&Raster::new(4, 4, SAFE)).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), first);

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"P6\n4 4\n255\n"));
        let _ = fs::remove_file(&path);
    }
}
