/*
 *  display/page.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pages - the neutral page and the per-measurement dashboards
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
//! A page is bound to the task views it reads and the plot worker it owns.
//! Activation starts the worker, deactivation stops and joins it; drawing
//! only ever reads published state, so a frame never waits on a sensor.

use core::fmt::Write;
use std::time::Duration;

use arrayvec::ArrayString;
use embedded_graphics::{
    mono_font::{
        iso_8859_1::{FONT_10X20, FONT_6X10},
        MonoFont,
    },
    pixelcolor::Rgb565,
    prelude::*,
};
use embedded_text::alignment::HorizontalAlignment;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{
    BAND_HEIGHT, BAND_TOP, COUNT_LABEL_POS, COVERAGE_LABEL_POS, DISPLAY_WIDTH, FOOTER_Y, INTERVAL_LABEL_POS,
    PAGE_RENDER_HISTORY, PING_BOX, PLOT_POS, READOUT_POS, TITLE_POS,
};
use crate::display::error::DisplayError;
use crate::display::palette::{self, Reachability, BLACK, FRESH, SAFE, STALE, WHITE};
use crate::display::traits::DisplayDriver;
use crate::draw::{draw_rectangle, draw_text, draw_text_align, draw_text_scaled};
use crate::func_timer::FunctionTimer;
use crate::stats::{coverage_hours, RenderTimes};
use crate::tasks::{PlotRenderTask, TaskView};
use crate::vframebuf::Raster;

const TITLE_FONT: &MonoFont = &FONT_10X20;
const SMALL_FONT: &MonoFont = &FONT_6X10;
const READOUT_SCALE: u32 = 2;
// second footer column
const FOOTER_SECOND_X: i32 = 100;

/// The measurements a dashboard can be built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Co2,
    Temperature,
    Humidity,
}

impl PageKind {
    pub fn title(self) -> &'static str {
        match self {
            PageKind::Co2 => "ppm CO2",
            PageKind::Temperature => "°C temp",
            PageKind::Humidity => "% rel. hum",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            PageKind::Co2 => "ppm",
            PageKind::Temperature => "°C",
            PageKind::Humidity => "%",
        }
    }

    fn footer_prefix(self) -> &'static str {
        match self {
            PageKind::Co2 => "co2:",
            PageKind::Temperature => "t:",
            PageKind::Humidity => "h:",
        }
    }

    /// Readout text, "--" before the first sample.
    fn format(self, value: Option<f32>) -> ArrayString<24> {
        let mut s = ArrayString::new();
        let unit = self.unit();
        let _ = match (self, value) {
            (_, None) => write!(s, "-- {unit}"),
            (PageKind::Co2, Some(v)) => write!(s, "{v:.0} {unit}"),
            (_, Some(v)) => write!(s, "{v:.1} {unit}"),
        };
        s
    }

    /// Status band color. Only CO2 has thresholds.
    fn band(self, value: Option<f32>) -> Rgb565 {
        match (self, value) {
            (PageKind::Co2, Some(ppm)) => palette::co2_band(ppm).color(),
            _ => SAFE,
        }
    }
}

/// Every task view a dashboard may show.
#[derive(Debug, Clone)]
pub struct DashboardViews {
    pub co2: TaskView,
    pub temperature: TaskView,
    pub humidity: TaskView,
    pub ping: Option<TaskView>,
}

impl DashboardViews {
    pub fn view(&self, kind: PageKind) -> &TaskView {
        match kind {
            PageKind::Co2 => &self.co2,
            PageKind::Temperature => &self.temperature,
            PageKind::Humidity => &self.humidity,
        }
    }
}

struct Dashboard {
    kind: PageKind,
    primary: TaskView,
    footers: [(PageKind, TaskView); 2],
    ping: Option<TaskView>,
    plot: PlotRenderTask,
    last_revision: Option<u8>,
}

pub struct PageController {
    name: String,
    dashboard: Option<Dashboard>,
    render_times: RenderTimes,
    active: bool,
}

impl PageController {
    /// Plain black page shown while switching and while the display is off.
    pub fn neutral() -> Self {
        Self {
            name: "neutral".to_string(),
            dashboard: None,
            render_times: RenderTimes::new(PAGE_RENDER_HISTORY),
            active: false,
        }
    }

    /// Dashboard for `kind`; the plot worker must render the same task.
    pub fn dashboard(kind: PageKind, views: &DashboardViews, plot: PlotRenderTask) -> Self {
        let others = match kind {
            PageKind::Co2 => [PageKind::Temperature, PageKind::Humidity],
            PageKind::Temperature => [PageKind::Co2, PageKind::Humidity],
            PageKind::Humidity => [PageKind::Co2, PageKind::Temperature],
        };
        let footers = others.map(|k| (k, views.view(k).clone()));
        Self {
            name: format!("{kind:?}").to_ascii_lowercase(),
            dashboard: Some(Dashboard {
                kind,
                primary: views.view(kind).clone(),
                footers,
                ping: views.ping.clone(),
                plot,
                last_revision: None,
            }),
            render_times: RenderTimes::new(PAGE_RENDER_HISTORY),
            active: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Option<PageKind> {
        self.dashboard.as_ref().map(|d| d.kind)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether this page's plot worker is live.
    pub fn plot_running(&self) -> bool {
        self.dashboard.as_ref().is_some_and(|d| d.plot.is_running())
    }

    /// Start the plot worker. Repeated calls are no-ops.
    pub fn activate(&mut self) {
        if let Some(d) = self.dashboard.as_mut() {
            d.plot.start();
        }
        self.active = true;
        debug!("page {}: active", self.name);
    }

    /// Stop and join the plot worker.
    pub async fn deactivate(&mut self) {
        if let Some(d) = self.dashboard.as_mut() {
            d.plot.stop().await;
        }
        self.active = false;
        debug!("page {}: inactive", self.name);
    }

    pub fn render_times(&self) -> &RenderTimes {
        &self.render_times
    }

    /// Hours a full primary series spans at the current render pace.
    pub fn coverage_hours(&self) -> Option<f32> {
        self.dashboard.as_ref().map(|d| {
            coverage_hours(d.primary.interval(), self.render_times.median(), d.primary.capacity())
        })
    }

    /// Compose into `frame` and push it. Returns how long that took.
    pub fn draw_frame(&mut self, frame: &mut Raster, driver: &mut dyn DisplayDriver) -> Result<Duration, DisplayError> {
        let timer = FunctionTimer::new("draw_frame");
        frame.clear_color(BLACK);
        if self.dashboard.is_some() {
            self.compose(frame)?;
        }
        driver.push_frame(frame)?;
        let took = timer.elapsed();
        self.render_times.push(took);
        Ok(took)
    }

    fn compose(&mut self, frame: &mut Raster) -> Result<(), DisplayError> {
        let coverage = self.coverage_hours();
        let Some(d) = self.dashboard.as_mut() else {
            return Ok(());
        };
        let reading = d.primary.reading();

        // header: title, poll interval, sample count
        draw_text(frame, d.kind.title(), Point::new(TITLE_POS.0, TITLE_POS.1), TITLE_FONT, WHITE)?;
        let mut label = ArrayString::<24>::new();
        let _ = write!(label, "sleep: {}s", d.primary.interval().as_secs());
        draw_text(frame, &label, Point::new(INTERVAL_LABEL_POS.0, INTERVAL_LABEL_POS.1), SMALL_FONT, WHITE)?;
        label.clear();
        let _ = write!(label, "#: {}", reading.history.len());
        draw_text(frame, &label, Point::new(COUNT_LABEL_POS.0, COUNT_LABEL_POS.1), SMALL_FONT, WHITE)?;

        // status band
        draw_rectangle(
            frame,
            Point::new(0, BAND_TOP),
            DISPLAY_WIDTH,
            BAND_HEIGHT,
            d.kind.band(reading.latest),
            None,
        )?;

        // readout, highlighted when a new sample landed since the last frame
        let color = if d.last_revision == Some(reading.revision) { STALE } else { FRESH };
        d.last_revision = Some(reading.revision);
        draw_text_scaled(
            frame,
            &d.kind.format(reading.latest),
            Point::new(READOUT_POS.0, READOUT_POS.1),
            TITLE_FONT,
            READOUT_SCALE,
            color,
        )?;

        if let Some(ping) = &d.ping {
            let (x0, y0, x1, y1) = PING_BOX;
            let status = Reachability::from_rtt(ping.latest());
            draw_rectangle(
                frame,
                Point::new(x0, y0),
                (x1 - x0 + 1) as u32,
                (y1 - y0 + 1) as u32,
                status.color(),
                None,
            )?;
        }

        // gate held for the clone only
        if let Some(plot) = d.plot.current() {
            frame.paste(&plot, Point::new(PLOT_POS.0, PLOT_POS.1));
        }

        for (i, (kind, view)) in d.footers.iter().enumerate() {
            let mut text = ArrayString::<24>::new();
            let _ = write!(text, "{}{}", kind.footer_prefix(), kind.format(view.latest()));
            let x = if i == 0 { 0 } else { FOOTER_SECOND_X };
            draw_text(frame, &text, Point::new(x, FOOTER_Y), SMALL_FONT, WHITE)?;
        }

        if let Some(hours) = coverage {
            label.clear();
            let _ = write!(label, "~{hours:.2}h");
            let width = DISPLAY_WIDTH - COVERAGE_LABEL_POS.0 as u32;
            draw_text_align(
                frame,
                &label,
                Point::new(COVERAGE_LABEL_POS.0, COVERAGE_LABEL_POS.1),
                width,
                HorizontalAlignment::Right,
                SMALL_FONT,
                WHITE,
            )?;
        }
        Ok(())
    }
}
