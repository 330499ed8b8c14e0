/*
 *  pacer.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Optional frame-rate cap for the render loop
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
use tokio::time::Instant;

pub struct Pacer {
    next_deadline: Instant,
    frame: Duration,
}

// SPI at 24MHz manages a full 240x240 push in ~40ms, anything above 25fps
// is wasted work - cap it when the board runs warm
impl Pacer {
    pub fn new(target_fps: u32) -> Self {
        let frame = Duration::from_micros((1_000_000u32 / target_fps.max(1)) as u64);
        Self { next_deadline: Instant::now(), frame }
    }

    pub fn frame(&self) -> Duration {
        self.frame
    }

    /// Returns true if a frame is due now; if true, it also schedules the next deadline.
    #[inline]
    pub fn should_flush(&mut self) -> bool {
        let now = Instant::now();
        if now >= self.next_deadline {
            self.next_deadline = now + self.frame;
            true
        } else {
            false
        }
    }

    /// Wait until the next frame is due.
    pub async fn wait(&mut self) {
        if !self.should_flush() {
            tokio::time::sleep_until(self.next_deadline).await;
            self.next_deadline += self.frame;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_length() {
        assert_eq!(Pacer::new(25).frame(), Duration::from_millis(40));
        // zero is clamped to one frame a second
        assert_eq!(Pacer::new(0).frame(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_wait_spaces_frames() {
        let mut pacer = Pacer::new(100);
        let start = Instant::now();
        pacer.wait().await; // first frame is due immediately
        pacer.wait().await;
        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
