//! Small helpers shared across CLI tests.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::TempDir;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::{CliError, RunSummary, run_cli};

pub(super) fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

pub(super) fn create_text_file(dir: &TempDir, name: &str, contents: &str) -> io::Result<PathBuf> {
    let path = dir.path().join(name);
    let mut file = File::create(&path)?;
    file.write_all(contents.as_bytes())?;
    Ok(path)
}

pub(super) fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|arg| (*arg).to_owned()).collect()
}

/// Runs the CLI and returns the summary together with anything written to
/// the usage writer.
pub(super) fn run(raw: &[&str]) -> Result<(Option<RunSummary>, String), CliError> {
    let mut out = Vec::new();
    let summary = run_cli(&args(raw), &mut out)?;
    Ok((summary, String::from_utf8_lossy(&out).into_owned()))
}

pub(super) fn run_expecting_summary(raw: &[&str]) -> RunSummary {
    match run(raw) {
        Ok((Some(summary), _)) => summary,
        Ok((None, usage)) => panic!("expected a dataset but usage was printed:\n{usage}"),
        Err(err) => panic!("run must succeed: {err}"),
    }
}

pub(super) fn run_expecting_error(raw: &[&str], panic_msg: &str) -> CliError {
    match run(raw) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}

/// Fields recorded from one tracing event.
#[derive(Clone, Debug, Default)]
pub(super) struct RecordedEvent {
    pub(super) fields: BTreeMap<String, String>,
}

impl RecordedEvent {
    pub(super) fn message(&self) -> Option<&str> {
        self.fields.get("message").map(String::as_str)
    }

    pub(super) fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Layer that keeps span names and event fields for later assertions.
#[derive(Clone, Default)]
pub(super) struct RecordingLayer {
    spans: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingLayer {
    pub(super) fn span_names(&self) -> Vec<String> {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(super) fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

struct FieldRecorder<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldRecorder<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_owned(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_owned(), format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for RecordingLayer {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        self.spans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(attrs.metadata().name().to_owned());
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorded = RecordedEvent::default();
        event.record(&mut FieldRecorder(&mut recorded.fields));
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(recorded);
    }
}
