/*
 *  display/manager.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display orchestrator - page selection, switching and the frame loop
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

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};

use crate::constants::{DISABLED_REFRESH, FPS_REPORT_EVERY, FPS_WINDOW};
use crate::display::error::DisplayError;
use crate::display::page::PageController;
use crate::display::palette::BLACK;
use crate::display::traits::DisplayDriver;
use crate::pacer::Pacer;
use crate::sensors::Gesture;
use crate::stats::RenderTimes;
use crate::vframebuf::Raster;

const COMMAND_QUEUE: usize = 16;

/// Requests accepted by the orchestrator, from gestures or anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayCommand {
    Enable,
    Disable,
    NextPage,
    PreviousPage,
}

impl DisplayCommand {
    pub fn from_gesture(gesture: Gesture) -> Option<Self> {
        match gesture {
            Gesture::Up => Some(DisplayCommand::Enable),
            Gesture::Down => Some(DisplayCommand::Disable),
            Gesture::Left => Some(DisplayCommand::NextPage),
            Gesture::Right => Some(DisplayCommand::PreviousPage),
            Gesture::None => None,
        }
    }
}

/// Owns the driver and the pages. Exactly one dashboard is active while the
/// display is enabled; a switch always passes through the neutral page.
pub struct DisplayOrchestrator {
    driver: Box<dyn DisplayDriver>,
    pages: Vec<PageController>,
    neutral: PageController,
    frame: Raster,
    current: usize,
    enabled: bool,
    pending_switch: bool,
    commands_tx: mpsc::Sender<DisplayCommand>,
    commands_rx: mpsc::Receiver<DisplayCommand>,
    pacer: Option<Pacer>,
    disabled_refresh: Duration,
    frame_times: RenderTimes,
    frames: u64,
}

impl DisplayOrchestrator {
    pub fn new(mut driver: Box<dyn DisplayDriver>, pages: Vec<PageController>) -> Result<Self, DisplayError> {
        if pages.is_empty() {
            return Err(DisplayError::InvalidConfiguration("no pages configured".to_string()));
        }
        driver.init()?;
        let (width, height) = driver.dimensions();
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        info!("display {}x{}, {} pages", width, height, pages.len());
        Ok(Self {
            driver,
            pages,
            neutral: PageController::neutral(),
            frame: Raster::new(width, height, BLACK),
            current: 0,
            enabled: true,
            // the first step brings page 0 up
            pending_switch: true,
            commands_tx,
            commands_rx,
            pacer: None,
            disabled_refresh: DISABLED_REFRESH,
            frame_times: RenderTimes::new(FPS_WINDOW),
            frames: 0,
        })
    }

    /// Cap the enabled frame rate. Zero leaves it uncapped.
    pub fn with_frame_cap(mut self, max_fps: u32) -> Self {
        self.pacer = (max_fps > 0).then(|| Pacer::new(max_fps));
        self
    }

    pub fn with_disabled_refresh(mut self, every: Duration) -> Self {
        self.disabled_refresh = every;
        self
    }

    /// Sender for commands; clone freely.
    pub fn commands(&self) -> mpsc::Sender<DisplayCommand> {
        self.commands_tx.clone()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn pending_switch(&self) -> bool {
        self.pending_switch
    }

    pub fn active_page(&self) -> &PageController {
        &self.pages[self.current]
    }

    pub fn page(&self, index: usize) -> Option<&PageController> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Frames drawn while enabled.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            info!("display enabled");
            self.enabled = true;
            self.pending_switch = true;
            self.backlight(true);
        }
    }

    pub fn disable(&mut self) {
        if self.enabled {
            info!("display disabled");
            self.enabled = false;
            self.backlight(false);
        }
    }

    fn backlight(&mut self, on: bool) {
        if !self.driver.capabilities().supports_backlight {
            return;
        }
        if let Err(e) = self.driver.set_backlight(on) {
            warn!("backlight {}: {e}", if on { "on" } else { "off" });
        }
    }

    /// Move right, stopping at the last page.
    pub fn next_page(&mut self) {
        let target = (self.current + 1).min(self.pages.len() - 1);
        self.select(target);
    }

    /// Move left, stopping at the first page.
    pub fn previous_page(&mut self) {
        self.select(self.current.saturating_sub(1));
    }

    fn select(&mut self, target: usize) {
        if target != self.current {
            debug!("page {} -> {}", self.current, target);
            self.current = target;
            self.pending_switch = true;
        }
    }

    pub fn apply(&mut self, cmd: DisplayCommand) {
        match cmd {
            DisplayCommand::Enable => self.enable(),
            DisplayCommand::Disable => self.disable(),
            DisplayCommand::NextPage => self.next_page(),
            DisplayCommand::PreviousPage => self.previous_page(),
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.commands_rx.try_recv() {
            self.apply(cmd);
        }
    }

    async fn deactivate_all(&mut self) {
        for page in self.pages.iter_mut().filter(|p| p.is_active()) {
            page.deactivate().await;
        }
    }

    fn draw_neutral(&mut self) -> Result<(), DisplayError> {
        self.neutral.draw_frame(&mut self.frame, self.driver.as_mut())?;
        Ok(())
    }

    /// Stop whatever is live, blank the panel, then bring up the selected
    /// page. The old plot worker is joined before the new one starts.
    pub async fn switch_page(&mut self) -> Result<(), DisplayError> {
        self.deactivate_all().await;
        self.draw_neutral()?;
        let page = &mut self.pages[self.current];
        page.activate();
        info!("showing page {}", page.name());
        self.pending_switch = false;
        Ok(())
    }

    /// One pass of the display loop.
    pub async fn step(&mut self) -> Result<(), DisplayError> {
        self.update().await?;
        self.idle(false).await;
        Ok(())
    }

    /// Commands, page lifecycle and the frame itself. Always run to completion.
    async fn update(&mut self) -> Result<(), DisplayError> {
        self.drain_commands();

        if !self.enabled {
            self.deactivate_all().await;
            return self.draw_neutral();
        }

        if self.pending_switch {
            return self.switch_page().await;
        }

        let page = &mut self.pages[self.current];
        let took = page.draw_frame(&mut self.frame, self.driver.as_mut())?;
        self.frame_times.push(took);
        self.frames += 1;
        if self.frames % FPS_REPORT_EVERY as u64 == 0 {
            info!("{}: {:.1} fps", page.name(), self.frame_times.fps());
        }
        Ok(())
    }

    /// Wait before the next pass. Safe to drop at any await.
    async fn idle(&mut self, backoff: bool) {
        if backoff {
            tokio::time::sleep(self.disabled_refresh).await;
            return;
        }
        if !self.enabled {
            let cmd = tokio::select! {
                _ = tokio::time::sleep(self.disabled_refresh) => None,
                cmd = self.commands_rx.recv() => cmd,
            };
            if let Some(cmd) = cmd {
                self.apply(cmd);
            }
            return;
        }
        match self.pacer.as_mut() {
            Some(pacer) => pacer.wait().await,
            None => tokio::task::yield_now().await,
        }
    }

    /// Run until `shutdown` flips to true. Frame errors are logged and the
    /// loop carries on. Shutdown only cuts the wait between passes short.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!("display loop running");
        let mut failures = 0u32;
        while !*shutdown.borrow() {
            let backoff = match self.update().await {
                Ok(()) => {
                    failures = 0;
                    false
                }
                Err(e) => {
                    failures += 1;
                    error!("frame failed: {e}");
                    // avoid spinning on a dead panel
                    failures > 1
                }
            };
            tokio::select! {
                _ = self.idle(backoff) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("shutdown channel closed");
                        break;
                    }
                }
            }
        }
        self.shutdown().await;
    }

    /// Stop the plot workers and leave the panel black.
    pub async fn shutdown(&mut self) {
        self.deactivate_all().await;
        if let Err(e) = self.draw_neutral() {
            warn!("final blank frame: {e}");
        }
        info!("display loop stopped after {} frames", self.frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::TrendChart;
    use crate::display::drivers::MockDriver;
    use crate::display::page::{DashboardViews, PageKind};
    use crate::tasks::{PlotRenderTask, Reading, TaskSettings, TaskView};

    fn views() -> (Vec<watch::Sender<Reading>>, DashboardViews) {
        let mut senders = Vec::new();
        let mut view = |name: &str| {
            let settings = TaskSettings::new(name, Duration::from_secs(1)).capacity(16);
            let (tx, view) = TaskView::channel(&settings, Reading::default());
            senders.push(tx);
            view
        };
        let views = DashboardViews {
            co2: view("CO2"),
            temperature: view("Temperature"),
            humidity: view("Humidity"),
            ping: None,
        };
        (senders, views)
    }

    fn orchestrator() -> (Vec<watch::Sender<Reading>>, MockDriver, DisplayOrchestrator) {
        let (senders, views) = views();
        let pages = [PageKind::Co2, PageKind::Temperature, PageKind::Humidity]
            .into_iter()
            .map(|kind| {
                let plot = PlotRenderTask::new(views.view(kind).clone(), Duration::from_millis(20), TrendChart::default());
                PageController::dashboard(kind, &views, plot)
            })
            .collect();
        let driver = MockDriver::default();
        let orch = DisplayOrchestrator::new(Box::new(driver.clone()), pages).unwrap();
        (senders, driver, orch)
    }

    fn running(orch: &DisplayOrchestrator) -> Vec<bool> {
        (0..orch.page_count()).map(|i| orch.page(i).unwrap().plot_running()).collect()
    }

    #[test]
    fn test_gesture_mapping() {
        assert_eq!(DisplayCommand::from_gesture(Gesture::Up), Some(DisplayCommand::Enable));
        assert_eq!(DisplayCommand::from_gesture(Gesture::Down), Some(DisplayCommand::Disable));
        assert_eq!(DisplayCommand::from_gesture(Gesture::Left), Some(DisplayCommand::NextPage));
        assert_eq!(DisplayCommand::from_gesture(Gesture::Right), Some(DisplayCommand::PreviousPage));
    }

    #[test]
    fn test_no_pages_rejected() {
        let res = DisplayOrchestrator::new(Box::new(MockDriver::default()), Vec::new());
        assert!(matches!(res, Err(DisplayError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_paging_clamps() {
        let (_s, _d, mut orch) = orchestrator();
        orch.step().await.unwrap();
        assert!(!orch.pending_switch());

        orch.previous_page();
        assert_eq!(orch.current_index(), 0);
        assert!(!orch.pending_switch());

        orch.next_page();
        orch.next_page();
        orch.next_page();
        assert_eq!(orch.current_index(), 2);
        assert!(orch.pending_switch());
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_switch_blanks_and_moves_plot_worker() {
        let (_s, driver, mut orch) = orchestrator();
        orch.step().await.unwrap();
        assert_eq!(running(&orch), vec![true, false, false]);

        orch.commands().send(DisplayCommand::NextPage).await.unwrap();
        let before = driver.frame_count();
        orch.step().await.unwrap();
        assert_eq!(running(&orch), vec![false, true, false]);
        assert_eq!(driver.frame_count(), before + 1);
        assert!(driver.last_frame_is(BLACK));

        orch.step().await.unwrap();
        assert!(!driver.last_frame_is(BLACK));
        assert_eq!(orch.frames(), 1);
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_disable_stops_plots_and_enable_restores() {
        let (_s, driver, mut orch) = orchestrator();
        orch.step().await.unwrap();
        orch = orch.with_disabled_refresh(Duration::from_millis(5));

        orch.apply(DisplayCommand::Disable);
        orch.step().await.unwrap();
        assert_eq!(running(&orch), vec![false, false, false]);
        assert!(driver.last_frame_is(BLACK));

        orch.apply(DisplayCommand::Enable);
        assert!(orch.pending_switch());
        orch.step().await.unwrap();
        assert_eq!(running(&orch), vec![true, false, false]);
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_disable_and_enable_switch_backlight() {
        let (_s, driver, mut orch) = orchestrator();
        let state = driver.state();
        orch.step().await.unwrap();
        assert_eq!(state.lock().unwrap().backlight, None);

        orch.apply(DisplayCommand::Disable);
        assert_eq!(state.lock().unwrap().backlight, Some(false));
        // repeated requests do not touch the panel again
        state.lock().unwrap().backlight = None;
        orch.apply(DisplayCommand::Disable);
        assert_eq!(state.lock().unwrap().backlight, None);

        orch.apply(DisplayCommand::Enable);
        assert_eq!(state.lock().unwrap().backlight, Some(true));
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_backlight_left_alone_without_support() {
        let (_s, views) = views();
        let plot = PlotRenderTask::new(views.co2.clone(), Duration::from_millis(20), TrendChart::default());
        let pages = vec![PageController::dashboard(PageKind::Co2, &views, plot)];
        let driver = MockDriver::default().without_backlight();
        let mut orch = DisplayOrchestrator::new(Box::new(driver.clone()), pages).unwrap();

        orch.apply(DisplayCommand::Disable);
        orch.apply(DisplayCommand::Enable);
        assert!(orch.is_enabled() && orch.pending_switch());
        assert_eq!(driver.state().lock().unwrap().backlight, None);
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_disabled_wakes_on_command() {
        let (_s, _d, orch) = orchestrator();
        let mut orch = orch.with_disabled_refresh(Duration::from_secs(3600));
        orch.apply(DisplayCommand::Disable);
        let tx = orch.commands();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(DisplayCommand::Enable).await;
        });
        tokio::time::timeout(Duration::from_secs(5), orch.step()).await.unwrap().unwrap();
        assert!(orch.is_enabled());
        orch.shutdown().await;
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown() {
        let (_s, driver, orch) = orchestrator();
        let mut orch = orch.with_frame_cap(200);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            orch.run(rx).await;
            orch
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send_replace(true);
        let orch = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert!(orch.frames() > 0);
        assert_eq!(running(&orch), vec![false, false, false]);
        assert!(driver.last_frame_is(BLACK));
    }

    #[tokio::test]
    async fn test_shutdown_mid_switching_leaves_no_plot_running() {
        let (_s, _d, orch) = orchestrator();
        let mut orch = orch.with_frame_cap(500);
        let commands = orch.commands();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            orch.run(rx).await;
            orch
        });
        for cmd in [DisplayCommand::NextPage, DisplayCommand::NextPage, DisplayCommand::PreviousPage] {
            commands.send(cmd).await.unwrap();
            tokio::task::yield_now().await;
        }
        tx.send_replace(true);

        let orch = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert_eq!(running(&orch), vec![false, false, false]);
        assert!((0..orch.page_count()).all(|i| !orch.page(i).unwrap().is_active()));
    }
}
