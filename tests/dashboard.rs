/*
 *  tests/dashboard.rs
 *
 *  End to end: scripted sensors through the tasks onto the pages
 *
 *  AirMonS - breathe easy
 *  (c) 2020-26 Stuart Hunter
 */

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use airmons::chart::TrendChart;
use airmons::constants::{BAND_TOP, DISPLAY_HEIGHT, DISPLAY_WIDTH, PING_BOX, UNREACHABLE_RTT_MS};
use airmons::display::palette::{co2_band, Co2Band, BLACK, CAUTION, REACHABLE, SAFE, UNREACHABLE};
use airmons::display::{DashboardViews, DisplayCommand, DisplayOrchestrator, MockDriver, PageController, PageKind};
use airmons::sensors::sim::{Co2Script, ScriptedClimate, ScriptedCo2, ScriptedGesture, ScriptedProbe};
use airmons::sensors::Gesture;
use airmons::storage::{BlobStore, MemoryStore};
use airmons::tasks::{
    ClimateHub, Co2Source, GestureTask, HumiditySource, PingSource, PlotRenderTask, Reading, SampleCycle,
    SensorTask, TaskSettings, TaskView, TemperatureSource,
};
use airmons::vframebuf::Raster;
use tokio::sync::watch;

fn store() -> Arc<dyn BlobStore> {
    Arc::new(MemoryStore::new())
}

fn co2_settings(capacity: usize, warmup: u32) -> TaskSettings {
    TaskSettings::new("CO2", Duration::from_secs(5)).capacity(capacity).warmup(warmup)
}

/// Views fed by hand, so a test can push readings straight into a page.
fn hand_views() -> (watch::Sender<Reading>, watch::Sender<Reading>, DashboardViews) {
    let settings = |name: &str| TaskSettings::new(name, Duration::from_secs(2)).capacity(10);
    let (co2_tx, co2) = TaskView::channel(&co2_settings(10, 0), Reading::default());
    let (_t, temperature) = TaskView::channel(&settings("Temperature"), Reading::default());
    let (_h, humidity) = TaskView::channel(&settings("Humidity"), Reading::default());
    let (ping_tx, ping) = TaskView::channel(&settings("Ping"), Reading::default());
    (co2_tx, ping_tx, DashboardViews { co2, temperature, humidity, ping: Some(ping) })
}

fn co2_page(views: &DashboardViews) -> PageController {
    let plot = PlotRenderTask::new(views.co2.clone(), Duration::from_millis(10), TrendChart::default());
    PageController::dashboard(PageKind::Co2, views, plot)
}

#[tokio::test]
async fn co2_readings_fill_series_and_color_band() {
    let mut cycle = SampleCycle::new(
        &co2_settings(10, 0),
        Co2Source::new(ScriptedCo2::new([Co2Script::Serial(800), Co2Script::Serial(800), Co2Script::Serial(1200)])),
        store(),
    );
    let (co2_tx, _ping_tx, views) = hand_views();
    for _ in 0..3 {
        let reading = cycle.run_once().expect("sample");
        co2_tx.send_replace(reading);
    }

    let reading = views.co2.reading();
    assert_eq!(&*reading.history, &[800.0, 800.0, 1200.0]);
    assert_eq!(reading.latest, Some(1200.0));
    assert_eq!(co2_band(1200.0), Co2Band::Caution);

    let mut page = co2_page(&views);
    let driver = MockDriver::default();
    let mut frame = Raster::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, BLACK);
    page.draw_frame(&mut frame, &mut driver.clone()).unwrap();
    assert_eq!(driver.last_pixel(100, BAND_TOP + 1), Some(CAUTION));
}

#[test]
fn serial_not_ready_falls_back_to_pwm() {
    let sensor = ScriptedCo2::new([Co2Script::Serial(800), Co2Script::PwmOnly(950)]);
    let pwm_reads = sensor.pwm_reads();
    let mut cycle = SampleCycle::new(&co2_settings(10, 0), Co2Source::new(sensor), store());

    cycle.run_once().expect("serial sample");
    let reading = cycle.run_once().expect("pwm sample");
    assert_eq!(&*reading.history, &[800.0, 950.0]);
    assert_eq!(pwm_reads.load(Ordering::SeqCst), 1);

    // script exhausted, both reads fail: nothing changes
    assert!(cycle.run_once().is_none());
    assert_eq!(cycle.ledger().series().len(), 2);
}

#[tokio::test]
async fn ping_status_box_follows_reachability() {
    let probe = ScriptedProbe::new(Some(Duration::from_millis(14)));
    let settings = TaskSettings::new("Ping", Duration::from_secs(30)).capacity(0).warmup(0);
    let mut cycle = SampleCycle::new(&settings, PingSource::new(probe.clone(), "router.lan"), store());
    let (_co2_tx, ping_tx, views) = hand_views();
    let mut page = co2_page(&views);
    let driver = MockDriver::default();
    let mut frame = Raster::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, BLACK);
    let box_pixel = || driver.last_pixel(PING_BOX.0 + 3, PING_BOX.1 + 3);

    ping_tx.send_replace(cycle.run_once().unwrap());
    page.draw_frame(&mut frame, &mut driver.clone()).unwrap();
    assert_eq!(box_pixel(), Some(REACHABLE));

    probe.set_answer(None);
    let reading = cycle.run_once().unwrap();
    assert_eq!(reading.latest, Some(UNREACHABLE_RTT_MS));
    assert!(reading.history.is_empty());
    ping_tx.send_replace(reading);
    page.draw_frame(&mut frame, &mut driver.clone()).unwrap();
    assert_eq!(box_pixel(), Some(UNREACHABLE));
}

#[test]
fn warm_up_discards_first_samples() {
    let steps = (0..6).map(|i| Co2Script::Serial(700 + i));
    let mut cycle = SampleCycle::new(&co2_settings(10, 5), Co2Source::new(ScriptedCo2::new(steps)), store());
    for i in 0..5 {
        let reading = cycle.run_once().unwrap();
        assert_eq!(reading.latest, Some(700.0 + i as f32));
        assert!(reading.history.is_empty());
    }
    let reading = cycle.run_once().unwrap();
    assert_eq!(&*reading.history, &[705.0]);
}

#[test]
fn revision_wraps_after_modulus_samples() {
    let steps = (0..50).map(|_| Co2Script::Serial(600));
    let mut cycle = SampleCycle::new(&co2_settings(10, 0), Co2Source::new(ScriptedCo2::new(steps)), store());
    let start = cycle.ledger().revision();
    let mut seen = Vec::new();
    for _ in 0..50 {
        seen.push(cycle.run_once().unwrap().revision);
    }
    assert_eq!(*seen.last().unwrap(), start);
    assert!(seen[..49].iter().all(|r| *r != start));
}

#[test]
fn history_survives_a_restart() {
    let store = store();
    let steps = [Co2Script::Serial(810), Co2Script::Serial(820)];
    let mut cycle = SampleCycle::new(&co2_settings(10, 0), Co2Source::new(ScriptedCo2::new(steps)), Arc::clone(&store));
    cycle.run_once();
    cycle.run_once();
    drop(cycle);

    let restarted = SampleCycle::new(&co2_settings(10, 0), Co2Source::new(ScriptedCo2::new(Vec::new())), store);
    assert_eq!(restarted.ledger().series().iter().collect::<Vec<_>>(), vec![810.0, 820.0]);
}

#[tokio::test]
async fn one_climate_read_is_one_sample() {
    let store = store();
    let steps = std::iter::once(Some((44.0, 21.5))).chain((0..100).map(|_| None));
    let mut hub = ClimateHub::spawn(ScriptedClimate::new(steps), Duration::from_millis(10));
    let mut temperature = SensorTask::spawn(
        TaskSettings::new("Temperature", Duration::from_millis(3)).warmup(0),
        TemperatureSource::new(hub.reader()),
        Arc::clone(&store),
    );

    // the hub keeps failing after its first read, the task polls many times over
    tokio::time::sleep(Duration::from_millis(200)).await;
    hub.stop().await;
    temperature.stop().await;

    let view = temperature.view();
    assert_eq!(&*view.history(), &[21.5]);
    assert_eq!(view.sample_count(), 1);
    assert_eq!(view.latest(), Some(21.5));
}

#[tokio::test]
async fn live_tasks_page_switch_and_gestures() {
    let store = store();
    let fast = Duration::from_millis(10);

    let mut hub = ClimateHub::spawn(ScriptedClimate::new((0..500).map(|_| Some((44.0, 21.5)))), fast);
    let mut co2 = SensorTask::spawn(
        TaskSettings::new("CO2", fast).warmup(0),
        Co2Source::new(ScriptedCo2::new((0..500).map(|_| Co2Script::Serial(900)))),
        Arc::clone(&store),
    );
    let mut temperature = SensorTask::spawn(
        TaskSettings::new("Temperature", fast).warmup(0),
        TemperatureSource::new(hub.reader()),
        Arc::clone(&store),
    );
    let mut humidity = SensorTask::spawn(
        TaskSettings::new("Humidity", fast).warmup(0),
        HumiditySource::new(hub.reader()),
        Arc::clone(&store),
    );

    let views = DashboardViews {
        co2: co2.view(),
        temperature: temperature.view(),
        humidity: humidity.view(),
        ping: None,
    };
    let pages = [PageKind::Co2, PageKind::Temperature]
        .into_iter()
        .map(|kind| {
            let plot = PlotRenderTask::new(views.view(kind).clone(), fast, TrendChart::default());
            PageController::dashboard(kind, &views, plot)
        })
        .collect();
    let driver = MockDriver::default();
    let mut orch = DisplayOrchestrator::new(Box::new(driver.clone()), pages).unwrap();

    // first step brings the CO2 page up through the neutral page
    orch.step().await.unwrap();
    assert!(driver.last_frame_is(BLACK));
    assert!(orch.page(0).unwrap().plot_running());

    tokio::time::sleep(Duration::from_millis(60)).await;
    orch.step().await.unwrap();
    assert_eq!(driver.last_pixel(100, BAND_TOP + 1), Some(SAFE));
    assert!(co2.view().sample_count() > 0);

    // a left swipe moves one page right
    let mut gestures = GestureTask::spawn(ScriptedGesture::new([Gesture::Left]), fast, orch.commands());
    tokio::time::sleep(Duration::from_millis(50)).await;
    orch.step().await.unwrap();
    assert_eq!(orch.current_index(), 1);
    assert!(!orch.page(0).unwrap().plot_running());
    assert!(orch.page(1).unwrap().plot_running());
    assert!(driver.last_frame_is(BLACK));

    // already on the last page
    orch.apply(DisplayCommand::NextPage);
    assert!(!orch.pending_switch());

    orch.shutdown().await;
    gestures.stop().await;
    co2.stop().await;
    temperature.stop().await;
    humidity.stop().await;
    hub.stop().await;
    assert!(!co2.is_running() && !hub.is_running());
    assert!(temperature.view().latest().is_some());
}
