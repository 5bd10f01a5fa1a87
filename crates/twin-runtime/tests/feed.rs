use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use twin_runtime::feed::{
    apply_to_roots, CycleOutcome, DataSnapshot, FeedError, FeedRunner, FeedState, MockSource,
    SimulationFeed, SnapshotSource,
};
use twin_runtime::Canvas;

const PLANT_SVG: &str = r#"<svg id="plant"><metadata data-level="40"/><g id="pump"/></svg>"#;

struct FixedSource(DataSnapshot);

impl SnapshotSource for FixedSource {
    fn fetch_snapshot(&mut self) -> Result<DataSnapshot, FeedError> {
        Ok(self.0.clone())
    }
}

struct FailingSource;

impl SnapshotSource for FailingSource {
    fn fetch_snapshot(&mut self) -> Result<DataSnapshot, FeedError> {
        Err(FeedError::Request {
            url: "http://127.0.0.1:1/api/data".into(),
            message: "connection refused".into(),
        })
    }
}

fn snapshot(pairs: &[(&str, &str)]) -> DataSnapshot {
    let mut snapshot = DataSnapshot::new();
    for (key, value) in pairs {
        snapshot.insert(*key, *value);
    }
    snapshot
}

fn plant_canvas() -> Canvas {
    let mut canvas = Canvas::default();
    canvas.load_svg("plant.svg", PLANT_SVG).expect("load plant");
    canvas
}

#[test]
fn failed_fetch_leaves_metadata_untouched() {
    let mut canvas = plant_canvas();
    let root = canvas.roots()[0];
    let before = canvas.to_markup();

    let mut feed = SimulationFeed::new();
    let outcome = feed.start(&mut canvas, &mut FailingSource);

    assert_eq!(outcome, CycleOutcome::Skipped);
    assert!(feed.is_running());
    assert_eq!(feed.applied_cycles(), 0);
    assert_eq!(canvas.read_metadata(root).get("level"), Some("40"));
    assert_eq!(canvas.to_markup(), before);
}

#[test]
fn cycle_merges_snapshot_into_roots() {
    let mut canvas = plant_canvas();
    let root = canvas.roots()[0];
    let mut source = FixedSource(snapshot(&[("temperature", "21.5"), ("valvePosition", "open")]));

    let mut feed = SimulationFeed::new();
    assert_eq!(feed.start(&mut canvas, &mut source), CycleOutcome::Applied { roots: 1 });

    let record = canvas.read_metadata(root);
    assert_eq!(record.get("level"), Some("40"));
    assert_eq!(record.get("temperature"), Some("21.5"));
    assert_eq!(record.get("valvePosition"), Some("open"));
    assert_eq!(canvas.data().get("temperature"), Some("21.5"));
}

#[test]
fn result_from_an_old_epoch_is_discarded() {
    let mut canvas = plant_canvas();
    let root = canvas.roots()[0];
    let mut feed = SimulationFeed::new();

    feed.begin();
    let ticket = feed.ticket().expect("running");
    feed.stop();
    feed.begin();

    let outcome = feed.complete(&mut canvas, ticket, Ok(snapshot(&[("level", "90")])));
    assert_eq!(outcome, CycleOutcome::Stale);
    assert_eq!(canvas.read_metadata(root).get("level"), Some("40"));

    let current = feed.ticket().expect("running");
    let outcome = feed.complete(&mut canvas, current, Ok(snapshot(&[("level", "90")])));
    assert_eq!(outcome, CycleOutcome::Applied { roots: 1 });
    assert_eq!(canvas.read_metadata(root).get("level"), Some("90"));
}

#[test]
fn idle_feed_applies_nothing() {
    let mut canvas = plant_canvas();
    let mut feed = SimulationFeed::new();
    assert_eq!(feed.ticket(), None);
    assert_eq!(
        feed.run_cycle(&mut canvas, &mut MockSource::with_seed(1)),
        CycleOutcome::Idle
    );
    assert_eq!(
        feed.complete(&mut canvas, 0, Ok(snapshot(&[("level", "1")]))),
        CycleOutcome::Stale
    );
}

#[test]
fn toggle_flips_state_and_epoch() {
    let mut canvas = plant_canvas();
    let mut source = MockSource::with_seed(3);
    let mut feed = SimulationFeed::new();

    assert_eq!(feed.toggle(&mut canvas, &mut source), FeedState::Running);
    assert_eq!(feed.epoch(), 1);
    assert_eq!(feed.applied_cycles(), 1);
    assert_eq!(feed.toggle(&mut canvas, &mut source), FeedState::Idle);
    assert_eq!(feed.epoch(), 2);

    feed.stop();
    assert_eq!(feed.epoch(), 2);
}

#[test]
fn sections_reach_only_their_root() {
    let mut canvas = Canvas::default();
    for (name, svg) in [
        ("tank1.svg", r#"<svg id="tank1"/>"#),
        ("tank2.svg", r#"<svg id="Tank2"/>"#),
        ("plain.svg", "<svg/>"),
    ] {
        canvas.load_svg(name, svg).expect("load");
    }
    let roots = canvas.roots();
    let data = snapshot(&[("timestamp", "t0"), ("tank1.level", "30"), ("tank2.level", "70")]);

    assert_eq!(apply_to_roots(&mut canvas, &data), 3);
    assert_eq!(canvas.read_metadata(roots[0]).get("level"), Some("30"));
    assert_eq!(canvas.read_metadata(roots[1]).get("level"), Some("70"));
    let anonymous = canvas.read_metadata(roots[2]);
    assert_eq!(anonymous.get("level"), None);
    assert_eq!(anonymous.get("timestamp"), Some("t0"));
}

#[test]
fn mock_feed_drives_builtin_tank() {
    let mut canvas = Canvas::with_builtin();
    canvas
        .load_svg(
            "tank.svg",
            r#"<svg id="tank"><rect id="tank-level" y="250" height="0"/></svg>"#,
        )
        .expect("load");
    let mut feed = SimulationFeed::new();
    let outcome = feed.start(&mut canvas, &mut MockSource::with_seed(11));
    assert_eq!(outcome, CycleOutcome::Applied { roots: 1 });

    let bar = canvas.element_by_id("tank-level").expect("bar");
    let level: f64 = canvas
        .read_metadata(canvas.roots()[0])
        .number("tankLevel")
        .expect("tank level");
    let height: f64 = canvas
        .document()
        .attribute(bar, "height")
        .and_then(|height| height.parse().ok())
        .expect("height");
    assert!((height - level * 2.0).abs() < 0.5);
}

#[test]
fn runner_applies_cycles_until_stopped() {
    let canvas = Arc::new(Mutex::new(plant_canvas()));
    let source = FixedSource(snapshot(&[("level", "55")]));
    let runner = FeedRunner::spawn(Arc::clone(&canvas), Box::new(source), Duration::from_millis(20));
    assert!(!runner.is_running());

    runner.start();
    let feed = runner.feed();
    let deadline = Instant::now() + Duration::from_secs(5);
    while feed.lock().unwrap().applied_cycles() == 0 {
        assert!(Instant::now() < deadline, "runner never applied a cycle");
        thread::sleep(Duration::from_millis(10));
    }

    runner.stop();
    assert!(!runner.is_running());
    let canvas = canvas.lock().unwrap();
    let root = canvas.roots()[0];
    assert_eq!(canvas.read_metadata(root).get("level"), Some("55"));
}
