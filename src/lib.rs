/*
 *  lib.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Library root: sampling tasks, rolling history, pages and the display loop
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

pub mod config;
pub mod constants;
pub mod chart;
pub mod display;
pub mod draw;
pub mod func_timer;
pub mod pacer;
pub mod rig;
pub mod sensors;
pub mod stats;
pub mod storage;
pub mod tasks;
pub mod vframebuf;

pub use display::{DisplayCommand, DisplayOrchestrator, PageController, PageKind};
pub use storage::{BlobStore, FileStore, MemoryStore, RollingSeries};
pub use tasks::{ClimateHub, PlotRenderTask, SensorTask, TaskView};
