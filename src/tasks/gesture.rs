/*
 *  tasks/gesture.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Gesture polling - swipes become display commands
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

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use super::{lock, nap, stop_requested, WorkerHandle};
use crate::display::DisplayCommand;
use crate::sensors::GestureSensor;

pub struct GestureTask {
    worker: WorkerHandle,
}

impl GestureTask {
    pub fn spawn(sensor: impl GestureSensor + 'static, interval: Duration, commands: mpsc::Sender<DisplayCommand>) -> Self {
        let sensor: Arc<Mutex<Box<dyn GestureSensor>>> = Arc::new(Mutex::new(Box::new(sensor)));

        let worker = WorkerHandle::spawn("gesture", move |mut stop_rx| async move {
            info!("gesture: polling every {interval:?}");
            loop {
                if stop_requested(&mut stop_rx) {
                    break;
                }
                let sensor = Arc::clone(&sensor);
                match tokio::task::spawn_blocking(move || lock(&sensor).poll()).await {
                    Ok(Ok(gesture)) => {
                        if let Some(cmd) = DisplayCommand::from_gesture(gesture) {
                            debug!("gesture: {gesture:?} -> {cmd:?}");
                            // best effort, a full queue drops the swipe
                            if commands.try_send(cmd).is_err() {
                                warn!("gesture: command queue full, dropped {cmd:?}");
                            }
                        }
                    }
                    Ok(Err(e)) => warn!("gesture: poll failed: {e}"),
                    Err(e) => error!("gesture: poll panicked: {e}"),
                }
                if nap(&mut stop_rx, interval).await {
                    break;
                }
            }
            info!("gesture: stopped");
        });

        Self { worker }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    pub async fn stop(&mut self) {
        self.worker.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::sim::ScriptedGesture;
    use crate::sensors::Gesture;

    #[tokio::test]
    async fn test_swipes_map_to_commands() {
        let (tx, mut rx) = mpsc::channel(16);
        let sensor = ScriptedGesture::new([Gesture::Right, Gesture::None, Gesture::Down, Gesture::Up]);
        let mut task = GestureTask::spawn(sensor, Duration::from_millis(1), tx);

        let mut seen = Vec::new();
        while seen.len() < 3 {
            let cmd = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
            seen.push(cmd);
        }
        assert_eq!(seen, vec![DisplayCommand::PreviousPage, DisplayCommand::Disable, DisplayCommand::Enable]);
        task.stop().await;
    }
}
