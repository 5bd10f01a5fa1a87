//! Simulation feed.
//!
//! A [`SnapshotSource`] produces flat snapshots of simulation values. Each
//! feed cycle merges the snapshot into the metadata of every SVG root on a
//! canvas and flushes once, which is what drives component updates.
//!
//! Stopping or restarting the feed bumps its epoch. A cycle carries the
//! epoch it started under, and its result is dropped if the epoch moved on
//! while the snapshot was being fetched.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::canvas::Canvas;
use crate::datetime::now_rfc3339;
use crate::metadata::{MetadataRecord, WriteMode};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);

/// Flat simulation values. Keys of nested sources read `section.field`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSnapshot(IndexMap<SmolStr, String>);

impl DataSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<SmolStr>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Flatten a JSON object. Nested objects become `parent.child` keys,
    /// arrays are kept as JSON text and `null` becomes an empty string.
    pub fn from_json(value: &Value) -> Result<Self, FeedError> {
        let Value::Object(map) = value else {
            return Err(FeedError::InvalidSnapshot("expected a JSON object".into()));
        };
        let mut snapshot = Self::new();
        for (key, value) in map {
            snapshot.flatten(key, value);
        }
        Ok(snapshot)
    }

    fn flatten(&mut self, key: &str, value: &Value) {
        match value {
            Value::Object(map) => {
                for (child, value) in map {
                    self.flatten(&format!("{key}.{child}"), value);
                }
            }
            Value::String(text) => self.insert(key, text.as_str()),
            Value::Null => self.insert(key, ""),
            Value::Bool(_) | Value::Number(_) | Value::Array(_) => {
                self.insert(key, value.to_string());
            }
        }
    }

    /// Values visible to one root: every unscoped key plus the fields of
    /// the section named `component` (compared case-insensitively).
    #[must_use]
    pub fn view_for(&self, component: Option<&str>) -> MetadataRecord {
        let mut view = MetadataRecord::new();
        for (key, value) in self.iter() {
            match key.split_once('.') {
                None => {
                    view.insert(key, value);
                }
                Some((section, field)) => {
                    if component.is_some_and(|id| id.eq_ignore_ascii_case(section)) {
                        view.insert(field, value);
                    }
                }
            }
        }
        view
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("request to {url} failed: {message}")]
    Request { url: SmolStr, message: SmolStr },
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(SmolStr),
}

pub trait SnapshotSource: Send {
    fn fetch_snapshot(&mut self) -> Result<DataSnapshot, FeedError>;
}

/// Local generator with bounded random values.
#[derive(Debug)]
pub struct MockSource {
    rng: StdRng,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SnapshotSource for MockSource {
    fn fetch_snapshot(&mut self) -> Result<DataSnapshot, FeedError> {
        let rng = &mut self.rng;
        let temperature: f64 = rng.gen_range(10.0..=40.0);
        let pressure: u32 = rng.gen_range(900..=1000) + rng.gen_range(0..=100);
        let flow: f64 = rng.gen_range(0.0..=100.0);
        let level: f64 = rng.gen_range(0.0..=100.0);
        let valve = if rng.gen_bool(0.5) { "open" } else { "closed" };

        let mut snapshot = DataSnapshot::new();
        snapshot.insert("temperature", format!("{temperature:.1}"));
        snapshot.insert("pressure", pressure.to_string());
        snapshot.insert("flow", format!("{flow:.1}"));
        snapshot.insert("valvePosition", valve);
        snapshot.insert("tankLevel", format!("{level:.1}"));
        snapshot.insert("timestamp", now_rfc3339());
        Ok(snapshot)
    }
}

/// `GET <base>/api/data` against the sensor API.
#[derive(Debug)]
pub struct HttpSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpSource {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(500))
            .timeout_read(Duration::from_millis(2000))
            .build();
        Self {
            url: format!("{}/api/data", base_url.trim_end_matches('/')),
            agent,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SnapshotSource for HttpSource {
    fn fetch_snapshot(&mut self) -> Result<DataSnapshot, FeedError> {
        let response = self.agent.get(&self.url).call().map_err(|err| FeedError::Request {
            url: self.url.as_str().into(),
            message: err.to_string().into(),
        })?;
        let body: Value = response
            .into_json()
            .map_err(|err| FeedError::InvalidSnapshot(err.to_string().into()))?;
        DataSnapshot::from_json(&body)
    }
}

/// Merge the snapshot into every SVG root of `canvas`, then flush once.
/// Returns the number of roots written.
pub fn apply_to_roots(canvas: &mut Canvas, snapshot: &DataSnapshot) -> usize {
    canvas.set_data(snapshot.clone());
    let mut written = 0;
    for root in canvas.roots() {
        let id = canvas.document().attribute(root, "id").map(SmolStr::new);
        let view = snapshot.view_for(id.as_deref());
        if view.is_empty() {
            continue;
        }
        canvas.write_metadata(root, &view, WriteMode::Merge);
        written += 1;
    }
    canvas.flush();
    written
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Running,
}

/// Result of one feed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Applied { roots: usize },
    /// The fetch failed; metadata was left as it was.
    Skipped,
    /// The feed was stopped or restarted while fetching.
    Stale,
    Idle,
}

#[derive(Debug)]
pub struct SimulationFeed {
    state: FeedState,
    epoch: u64,
    applied: u64,
}

impl Default for SimulationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationFeed {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: FeedState::Idle,
            epoch: 0,
            applied: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> FeedState {
        self.state
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == FeedState::Running
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of cycles whose snapshot reached the canvas.
    #[must_use]
    pub fn applied_cycles(&self) -> u64 {
        self.applied
    }

    /// Enter `Running` under a new epoch without running a cycle.
    pub fn begin(&mut self) -> u64 {
        self.state = FeedState::Running;
        self.epoch += 1;
        info!(epoch = self.epoch, "simulation started");
        self.epoch
    }

    /// Enter `Running` and apply one cycle immediately.
    pub fn start(&mut self, canvas: &mut Canvas, source: &mut dyn SnapshotSource) -> CycleOutcome {
        self.begin();
        self.run_cycle(canvas, source)
    }

    pub fn stop(&mut self) {
        if self.state == FeedState::Idle {
            return;
        }
        self.state = FeedState::Idle;
        self.epoch += 1;
        info!(epoch = self.epoch, "simulation stopped");
    }

    /// Flip between running and idle. Starting applies one cycle.
    pub fn toggle(&mut self, canvas: &mut Canvas, source: &mut dyn SnapshotSource) -> FeedState {
        if self.is_running() {
            self.stop();
        } else {
            self.start(canvas, source);
        }
        self.state
    }

    /// Epoch to carry through a fetch, or `None` while idle.
    #[must_use]
    pub fn ticket(&self) -> Option<u64> {
        self.is_running().then_some(self.epoch)
    }

    /// Apply a fetched result if `ticket` is still current.
    pub fn complete(
        &mut self,
        canvas: &mut Canvas,
        ticket: u64,
        result: Result<DataSnapshot, FeedError>,
    ) -> CycleOutcome {
        if !self.is_running() || ticket != self.epoch {
            debug!(ticket, epoch = self.epoch, "discarding stale snapshot");
            return CycleOutcome::Stale;
        }
        match result {
            Ok(snapshot) => {
                let roots = apply_to_roots(canvas, &snapshot);
                self.applied += 1;
                CycleOutcome::Applied { roots }
            }
            Err(err) => {
                warn!("simulation fetch failed: {err}");
                CycleOutcome::Skipped
            }
        }
    }

    /// Fetch and apply one snapshot if running.
    pub fn run_cycle(&mut self, canvas: &mut Canvas, source: &mut dyn SnapshotSource) -> CycleOutcome {
        let Some(ticket) = self.ticket() else {
            return CycleOutcome::Idle;
        };
        let result = source.fetch_snapshot();
        self.complete(canvas, ticket, result)
    }
}

enum RunnerCommand {
    Wake,
    Shutdown,
}

/// Background thread running feed cycles every `interval` while the feed
/// is running. Snapshots are fetched without holding the canvas lock.
pub struct FeedRunner {
    feed: Arc<Mutex<SimulationFeed>>,
    commands: Sender<RunnerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl FeedRunner {
    pub fn spawn(
        canvas: Arc<Mutex<Canvas>>,
        mut source: Box<dyn SnapshotSource>,
        interval: Duration,
    ) -> Self {
        let feed = Arc::new(Mutex::new(SimulationFeed::new()));
        let (commands, rx) = mpsc::channel();
        let thread_feed = Arc::clone(&feed);
        let handle = thread::spawn(move || loop {
            let running = thread_feed.lock().expect("feed lock poisoned").is_running();
            let command = if running {
                rx.recv_timeout(interval)
            } else {
                rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
            };
            match command {
                Ok(RunnerCommand::Wake) | Err(RecvTimeoutError::Timeout) => {}
                Ok(RunnerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            }
            let Some(ticket) = thread_feed.lock().expect("feed lock poisoned").ticket() else {
                continue;
            };
            let result = source.fetch_snapshot();
            let mut canvas = canvas.lock().expect("canvas lock poisoned");
            let outcome = thread_feed
                .lock()
                .expect("feed lock poisoned")
                .complete(&mut canvas, ticket, result);
            debug!(?outcome, "feed cycle");
        });
        Self {
            feed,
            commands,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn feed(&self) -> Arc<Mutex<SimulationFeed>> {
        Arc::clone(&self.feed)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.feed.lock().expect("feed lock poisoned").is_running()
    }

    /// Start polling; the first cycle runs right away on the runner thread.
    pub fn start(&self) {
        self.feed.lock().expect("feed lock poisoned").begin();
        let _ = self.commands.send(RunnerCommand::Wake);
    }

    pub fn stop(&self) {
        self.feed.lock().expect("feed lock poisoned").stop();
        let _ = self.commands.send(RunnerCommand::Wake);
    }
}

impl Drop for FeedRunner {
    fn drop(&mut self) {
        let _ = self.commands.send(RunnerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
