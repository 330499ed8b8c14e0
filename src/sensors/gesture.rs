/*
 *  sensors/gesture.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Gesture sources without gesture hardware: keyboard lines, or nothing
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

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use log::{debug, info};

use super::{Gesture, GestureSensor, SensorError};

/// Map a typed line to a swipe: u/d/l/r or the full word.
pub fn parse_gesture(line: &str) -> Option<Gesture> {
    match line.trim().to_ascii_lowercase().as_str() {
        "u" | "up" => Some(Gesture::Up),
        "d" | "down" => Some(Gesture::Down),
        "l" | "left" => Some(Gesture::Left),
        "r" | "right" => Some(Gesture::Right),
        _ => None,
    }
}

/// Swipes typed one per line, read on a helper thread so `poll` never blocks.
pub struct LineGesture {
    rx: Receiver<Gesture>,
}

impl LineGesture {
    pub fn stdin() -> Self {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                match parse_gesture(&line) {
                    Some(g) => {
                        if tx.send(g).is_err() {
                            break;
                        }
                    }
                    None => debug!("ignoring gesture input {line:?}"),
                }
            }
            info!("gesture input closed");
        });
        Self { rx }
    }
}

impl GestureSensor for LineGesture {
    fn poll(&mut self) -> Result<Gesture, SensorError> {
        match self.rx.try_recv() {
            Ok(g) => Ok(g),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(Gesture::None),
        }
    }
}

/// No gesture hardware fitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGesture;

impl GestureSensor for NoGesture {
    fn poll(&mut self) -> Result<Gesture, SensorError> {
        Ok(Gesture::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    #[test]
    fn test_parse_gesture() {
        assert_eq!(parse_gesture("u"), Some(Gesture::Up));
        assert_eq!(parse_gesture(" Down \n"), Some(Gesture::Down));
        assert_eq!(parse_gesture("l"), Some(Gesture::Left));
        assert_eq!(parse_gesture("RIGHT"), Some(Gesture::Right));
        assert_eq!(parse_gesture("x"), None);
    }

    #[test]
    fn test_line_gesture_delivers_in_order() {
        let mut g = LineGesture::from_reader(Cursor::new("r\nnope\nl\n"));
        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while seen.len() < 2 && Instant::now() < deadline {
            match g.poll().unwrap() {
                Gesture::None => std::thread::sleep(Duration::from_millis(5)),
                other => seen.push(other),
            }
        }
        assert_eq!(seen, vec![Gesture::Right, Gesture::Left]);
    }
}
