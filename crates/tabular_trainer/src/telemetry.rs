//! Run-scoped logging context and optional telemetry
//!
//! Every component receives a `LogContext`. Messages go to `tracing` inside a
//! span carrying the run identifiers; when a `TelemetrySink` is attached, a
//! scrubbed copy is also forwarded there. Sink failures never fail the run.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info_span, Span};

/// Component name attached to telemetry events
pub const COMPONENT: &str = "tabular_trainer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp: String,
    pub level: Level,
    pub component: String,
    pub message: String,
    pub codegen_run_id: String,
    pub automl_run_id: String,
}

/// Destination for scrubbed log events
pub trait TelemetrySink {
    fn emit(&self, event: &TelemetryEvent) -> std::io::Result<()>;
}

/// Appends events as JSON lines to a local file
#[derive(Debug, Clone)]
pub struct FileTelemetrySink {
    path: PathBuf,
}

impl FileTelemetrySink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for FileTelemetrySink {
    fn emit(&self, event: &TelemetryEvent) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(event)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'|`[^`]*`"#).expect("static regex"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+").expect("static regex"));
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("static regex")
});
static PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[A-Za-z]:)?(?:\.{1,2})?[/\\](?:[\w.\-]+[/\\])+[\w.\-]*").expect("static regex")
});

/// Mask quoted strings, e-mail addresses, UUIDs and file paths
pub fn scrub(message: &str) -> String {
    let masked = QUOTED.replace_all(message, "[REDACTED]");
    let masked = EMAIL.replace_all(&masked, "[EMAIL]");
    let masked = UUID.replace_all(&masked, "[ID]");
    PATH.replace_all(&masked, "[PATH]").into_owned()
}

pub struct LogContext {
    span: Span,
    codegen_run_id: String,
    automl_run_id: String,
    telemetry: Option<Box<dyn TelemetrySink>>,
}

impl LogContext {
    pub fn new(codegen_run_id: impl Into<String>, automl_run_id: impl Into<String>) -> Self {
        let codegen_run_id = codegen_run_id.into();
        let automl_run_id = automl_run_id.into();
        let span = info_span!(
            "training_run",
            codegen_run_id = %codegen_run_id,
            automl_run_id = %automl_run_id
        );

        Self {
            span,
            codegen_run_id,
            automl_run_id,
            telemetry: None,
        }
    }

    pub fn with_telemetry(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn codegen_run_id(&self) -> &str {
        &self.codegen_run_id
    }

    pub fn automl_run_id(&self) -> &str {
        &self.automl_run_id
    }

    pub fn info(&self, message: &str) {
        tracing::info!(parent: &self.span, "{}", message);
        self.forward(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(parent: &self.span, "{}", message);
        self.forward(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!(parent: &self.span, "{}", message);
        self.forward(Level::Error, message);
    }

    /// Log a fatal error with its full cause chain
    pub fn report_failure(&self, err: &anyhow::Error) {
        self.error(&format!("training run failed: {:#}", err));
    }

    fn forward(&self, level: Level, message: &str) {
        let Some(sink) = &self.telemetry else {
            return;
        };

        let event = TelemetryEvent {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            component: COMPONENT.to_string(),
            message: scrub(message),
            codegen_run_id: self.codegen_run_id.clone(),
            automl_run_id: self.automl_run_id.clone(),
        };

        if let Err(err) = sink.emit(&event) {
            tracing::warn!(parent: &self.span, error = %err, "telemetry event dropped");
        }
    }
}
