/*
 *  config.rs
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 *
 *  Configuration - defaults, YAML file and command line, in that order
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::{data_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::chart::TrendChart;
use crate::constants::{
    DEFAULT_REVISION_MODULUS, DEFAULT_SERIES_CAPACITY, DEFAULT_SMOOTHING_WINDOW, DEFAULT_WARMUP_CYCLES,
    DISABLED_REFRESH, PLOT_HEIGHT, PLOT_WIDTH,
};
use crate::display::PageKind;
use crate::tasks::TaskSettings;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every section falls back to its defaults,
/// so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// e.g. "info" | "debug", RUST_LOG still wins
    pub log_level: Option<String>,
    /// simulated sensors instead of hardware
    pub simulate: bool,
    /// where the rolling series are kept between runs
    pub storage_dir: Option<PathBuf>,
    pub revision_modulus: u8,
    pub display: DisplayConfig,
    pub co2: Co2Config,
    pub climate: ClimateConfig,
    pub temperature: SeriesConfig,
    pub humidity: SeriesConfig,
    pub ping: Option<PingConfig>,
    pub gesture: GestureConfig,
    pub plot: PlotConfig,
    /// left to right, as the gestures page through them
    pub pages: Vec<PageKind>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            simulate: false,
            storage_dir: None,
            revision_modulus: DEFAULT_REVISION_MODULUS,
            display: DisplayConfig::default(),
            co2: Co2Config::default(),
            climate: ClimateConfig::default(),
            temperature: SeriesConfig::default(),
            humidity: SeriesConfig::default(),
            ping: None,
            gesture: GestureConfig::default(),
            plot: PlotConfig::default(),
            pages: vec![PageKind::Co2, PageKind::Temperature, PageKind::Humidity],
        }
    }
}

impl Config {
    /// Configured directory, else the user data dir, else ./state.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .or_else(|| data_dir().map(|d| d.join("airmons")))
            .unwrap_or_else(|| PathBuf::from("state"))
    }

    pub fn co2_settings(&self) -> TaskSettings {
        TaskSettings::new("CO2", secs(self.co2.interval_secs))
            .capacity(self.co2.capacity)
            .warmup(self.co2.warmup)
            .revision_modulus(self.revision_modulus)
    }

    pub fn temperature_settings(&self) -> TaskSettings {
        self.temperature.settings("Temperature", self.revision_modulus)
    }

    pub fn humidity_settings(&self) -> TaskSettings {
        self.humidity.settings("Humidity", self.revision_modulus)
    }

    /// None when no ping host is configured.
    pub fn ping_settings(&self) -> Option<TaskSettings> {
        self.ping.as_ref().map(|p| {
            TaskSettings::new("Ping", secs(p.interval_secs))
                .capacity(p.capacity)
                .warmup(0)
                .revision_modulus(self.revision_modulus)
        })
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    St7789,
    Headless,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub driver: DriverKind,
    pub width: u32,
    pub height: u32,
    pub rotate_deg: u16,
    pub offset_x: u16,
    pub offset_y: u16,
    pub spi_bus: String,
    pub speed_hz: u32,
    pub gpio_chip: String,
    pub dc_pin: u32,
    pub rst_pin: u32,
    /// 0 leaves the frame rate uncapped
    pub max_fps: u32,
    /// headless only: PPM dump of the panel contents
    pub snapshot_path: Option<PathBuf>,
    pub disabled_refresh_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let driver = if cfg!(feature = "driver-st7789") { DriverKind::St7789 } else { DriverKind::Headless };
        Self {
            driver,
            width: 240,
            height: 240,
            rotate_deg: 180,
            offset_x: 0,
            offset_y: 80,
            spi_bus: "/dev/spidev0.0".to_string(),
            speed_hz: 24_000_000,
            gpio_chip: "/dev/gpiochip0".to_string(),
            dc_pin: 25,
            rst_pin: 27,
            max_fps: 0,
            snapshot_path: None,
            disabled_refresh_ms: DISABLED_REFRESH.as_millis() as u64,
        }
    }
}

impl DisplayConfig {
    pub fn disabled_refresh(&self) -> Duration {
        Duration::from_millis(self.disabled_refresh_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Co2Config {
    pub interval_secs: u64,
    pub capacity: usize,
    pub warmup: u32,
    pub serial_port: String,
    pub pwm_pin: u8,
    /// detection range the PWM duty cycle is scaled to
    pub pwm_span_ppm: u32,
}

impl Default for Co2Config {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            capacity: DEFAULT_SERIES_CAPACITY,
            warmup: DEFAULT_WARMUP_CYCLES,
            serial_port: "/dev/serial0".to_string(),
            pwm_pin: 12,
            pwm_span_ppm: 5000,
        }
    }
}

/// The DHT22 behind the shared climate hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub interval_secs: u64,
    pub iio_device: PathBuf,
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            iio_device: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
            retries: 15,
            retry_delay_ms: 2000,
        }
    }
}

/// Temperature and humidity tasks read the hub, so only the series knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    pub interval_secs: u64,
    pub capacity: usize,
    pub warmup: u32,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            capacity: DEFAULT_SERIES_CAPACITY,
            warmup: DEFAULT_WARMUP_CYCLES,
        }
    }
}

impl SeriesConfig {
    fn settings(&self, name: &str, modulus: u8) -> TaskSettings {
        TaskSettings::new(name, secs(self.interval_secs))
            .capacity(self.capacity)
            .warmup(self.warmup)
            .revision_modulus(modulus)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PingConfig {
    pub host: String,
    pub interval_secs: u64,
    /// reachability only by default, no history
    pub capacity: usize,
    pub timeout_secs: u64,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            host: "1.1.1.1".to_string(),
            interval_secs: 30,
            capacity: 0,
            timeout_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureSource {
    None,
    Stdin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub source: GestureSource,
    pub interval_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self { source: GestureSource::None, interval_ms: 200 }
    }
}

impl GestureConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub interval_secs: u64,
    pub smoothing_window: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self { interval_secs: 10, smoothing_window: DEFAULT_SMOOTHING_WINDOW }
    }
}

impl PlotConfig {
    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }

    pub fn chart(&self) -> TrendChart {
        TrendChart::new(PLOT_WIDTH, PLOT_HEIGHT, self.smoothing_window)
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "airmons", about = "AirMonS air quality monitor", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Directory for the persisted series
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub storage_dir: Option<PathBuf>,
    /// Run on simulated sensors
    #[arg(long, action = ArgAction::SetTrue)]
    pub simulate: bool,
    /// Use the headless display whatever the config says
    #[arg(long, action = ArgAction::SetTrue)]
    pub headless: bool,
    /// Headless PPM snapshot file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub snapshot: Option<PathBuf>,
    #[arg(long)]
    pub max_fps: Option<u32>,
    #[arg(long)]
    pub co2_interval_secs: Option<u64>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layering without touching the process arguments.
pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) YAML file (explicit path or search), defaults fill the gaps
    let mut cfg = match cli.config.as_ref() {
        Some(p) if p.exists() => read_yaml(p)?,
        Some(p) => {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
        None => match find_config_file() {
            Some(p) => read_yaml(&p)?,
            None => Config::default(),
        },
    };

    // 2) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 3) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/airmons/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/airmons/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/airmons.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["airmons.yaml", "config.yaml", "config/airmons.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    // an empty file is a valid "all defaults"
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(s)?)
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }
    if cli.storage_dir.is_some()     { cfg.storage_dir = cli.storage_dir.clone(); }
    if cli.simulate                  { cfg.simulate = true; }
    if cli.headless                  { cfg.display.driver = DriverKind::Headless; }
    if cli.snapshot.is_some()        { cfg.display.snapshot_path = cli.snapshot.clone(); }
    if let Some(fps) = cli.max_fps   { cfg.display.max_fps = fps; }
    if let Some(s) = cli.co2_interval_secs { cfg.co2.interval_secs = s; }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let display = &cfg.display;
    if display.width == 0 || display.height == 0 {
        return Err(ConfigError::Validation("display width/height must be > 0".into()));
    }
    match display.rotate_deg {
        0 | 90 | 180 | 270 => {},
        _ => return Err(ConfigError::Validation("display rotate_deg must be 0|90|180|270".into()))
    }
    if cfg.revision_modulus < 2 {
        return Err(ConfigError::Validation("revision_modulus must be >= 2".into()));
    }
    if cfg.pages.is_empty() {
        return Err(ConfigError::Validation("at least one page is required".into()));
    }

    let mut intervals = vec![
        ("co2", cfg.co2.interval_secs),
        ("climate", cfg.climate.interval_secs),
        ("temperature", cfg.temperature.interval_secs),
        ("humidity", cfg.humidity.interval_secs),
        ("plot", cfg.plot.interval_secs),
        ("gesture", cfg.gesture.interval_ms),
    ];
    if let Some(ping) = cfg.ping.as_ref() {
        if ping.host.trim().is_empty() {
            return Err(ConfigError::Validation("ping host must not be empty".into()));
        }
        intervals.push(("ping", ping.interval_secs));
    }
    if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
        return Err(ConfigError::Validation(format!("{name} interval must be > 0")));
    }
    Ok(())
}
