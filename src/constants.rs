//! This module contains global constants used across the pages, tasks and drawing code.

use std::time::Duration;

/// The total width of the TFT panel in pixels.
pub const DISPLAY_WIDTH: u32 = 240;
/// The total height of the TFT panel in pixels.
pub const DISPLAY_HEIGHT: u32 = 240;

// page geometry - positions follow the original 240x240 layout
/// Top-left of the page title.
pub const TITLE_POS: (i32, i32) = (0, 0);
/// Top-left of the "sleep: Ns" poll interval label.
pub const INTERVAL_LABEL_POS: (i32, i32) = (110, 10);
/// Top-left of the "#: n" sample count label.
pub const COUNT_LABEL_POS: (i32, i32) = (180, 10);
/// Status color band under the title.
pub const BAND_TOP: i32 = 40;
/// Height of the status color band.
pub const BAND_HEIGHT: u32 = 3;
/// Top-left of the big numeric readout.
pub const READOUT_POS: (i32, i32) = (0, 50);
/// Reachability status box, (x0, y0, x1, y1) inclusive.
pub const PING_BOX: (i32, i32, i32, i32) = (205, 60, 230, 85);
/// Where the trend plot bitmap is pasted.
pub const PLOT_POS: (i32, i32) = (10, 100);
/// Trend plot bitmap width (2.3in at 100dpi).
pub const PLOT_WIDTH: u32 = 230;
/// Trend plot bitmap height (0.9in at 100dpi).
pub const PLOT_HEIGHT: u32 = 90;
/// Baseline row of the footer labels.
pub const FOOTER_Y: i32 = 220;
/// Top-left of the "~X.XXh" coverage label.
pub const COVERAGE_LABEL_POS: (i32, i32) = (180, 220);

// task defaults
/// Accepted cycles discarded as sensor settling noise.
pub const DEFAULT_WARMUP_CYCLES: u32 = 5;
/// The revision counter wraps at this modulus.
pub const DEFAULT_REVISION_MODULUS: u8 = 50;
/// Samples kept per series unless configured otherwise.
pub const DEFAULT_SERIES_CAPACITY: usize = 2500;
/// Render-time history kept by each page for the coverage estimate.
pub const PAGE_RENDER_HISTORY: usize = 2500;
/// Render-time window used for the FPS report.
pub const FPS_WINDOW: usize = 50;
/// Log the average FPS every this many frames.
pub const FPS_REPORT_EVERY: usize = 50;
/// Neutral page refresh period while the display is switched off.
pub const DISABLED_REFRESH: Duration = Duration::from_millis(500);
/// Window of the moving-difference overlay in the trend plot.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 10;

// CO2 thresholds (ppm)
/// Below this the air is fine.
pub const CO2_CAUTION_PPM: f32 = 1000.0;
/// At or above this it is time to open a window.
pub const CO2_WARNING_PPM: f32 = 1400.0;

/// Latest-value sentinel a ping task publishes for an unreachable host.
pub const UNREACHABLE_RTT_MS: f32 = -1.0;
