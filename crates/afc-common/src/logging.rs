//! ---
//! afc_section: "01-core-functionality"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Shared configuration and logging for the conformance harness."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Tracing setup for harness runs.
//!
//! Besides the console and the daily run log, every event recorded inside a
//! `test_case` span is appended to `<directory>/<test>.log` as a
//! `(SEVERITY) message` line, so each test case leaves a readable log of its own.

use std::fmt as std_fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{info, Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "AFC_HARNESS_LOG";

/// Name of the span the conformance engine opens around each test case.
pub const CASE_SPAN: &str = "test_case";

/// Available log formats for harness console output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

struct InstalledLogging {
    _run_log: WorkerGuard,
    _console: WorkerGuard,
}

static INSTALLED: OnceCell<InstalledLogging> = OnceCell::new();

/// Installs the global subscriber once per process; later calls are no-ops.
///
/// The filter comes from `AFC_HARNESS_LOG`, then `RUST_LOG`, then `info`. An
/// unparsable `AFC_HARNESS_LOG` is an error.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    INSTALLED.get_or_try_init(|| install(service_name, config))?;
    Ok(())
}

fn install(service_name: &str, config: &LoggingConfig) -> Result<InstalledLogging> {
    fs::create_dir_all(&config.directory).with_context(|| {
        format!("failed to create log directory {}", config.directory.display())
    })?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);

    let (run_writer, run_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}-{service_name}.log")));
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stdout());

    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive)
            .with_context(|| format!("invalid {LOG_ENV} directive `{directive}`"))?,
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(console_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(console_writer)
            .boxed(),
    };

    let run_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(run_writer)
        .boxed();

    let case_layer = config
        .case_logs
        .then(|| CaseLogLayer::new(&config.directory));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(run_layer)
        .with(case_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        case_logs = config.case_logs,
        "tracing initialised"
    );
    Ok(InstalledLogging {
        _run_log: run_guard,
        _console: console_guard,
    })
}

/// Layer that writes the events of each `test_case` span to that case's log file.
///
/// Events at debug and trace level are left to the run log.
#[derive(Debug, Clone)]
pub struct CaseLogLayer {
    directory: PathBuf,
}

impl CaseLogLayer {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Log file for `test_name`. Path separators in the name are replaced.
    pub fn log_path(&self, test_name: &str) -> PathBuf {
        let file_stem: String = test_name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.directory.join(format!("{file_stem}.log"))
    }
}

/// Test name stored on a `test_case` span.
struct CaseName(String);

#[derive(Default)]
struct CaseNameVisitor(Option<String>);

impl Visit for CaseNameVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "test" {
            self.0 = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std_fmt::Debug) {
        if field.name() == "test" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

#[derive(Default)]
struct CaseLine {
    message: String,
    severity: Option<String>,
}

impl Visit for CaseLine {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_owned(),
            "severity" => self.severity = Some(value.to_owned()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std_fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "severity" => self.severity = Some(format!("{value:?}")),
            _ => {}
        }
    }
}

fn level_label(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        _ => "TRACE",
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

impl<S> Layer<S> for CaseLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if attrs.metadata().name() != CASE_SPAN {
            return;
        }
        let mut visitor = CaseNameVisitor::default();
        attrs.record(&mut visitor);
        if let (Some(name), Some(span)) = (visitor.0, ctx.span(id)) {
            span.extensions_mut().insert(CaseName(name));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let level = event.metadata().level();
        if *level > Level::INFO {
            return;
        }
        let Some(scope) = ctx.event_scope(event) else {
            return;
        };
        let test_name = scope.into_iter().find_map(|span| {
            let extensions = span.extensions();
            extensions.get::<CaseName>().map(|name| name.0.clone())
        });
        let Some(test_name) = test_name else {
            return;
        };

        let mut line = CaseLine::default();
        event.record(&mut line);
        let label = line
            .severity
            .map(|severity| severity.to_uppercase())
            .unwrap_or_else(|| level_label(level).to_owned());

        let path = self.log_path(&test_name);
        if let Err(err) = append_line(&path, &format!("({label}) {}", line.message)) {
            eprintln!("failed to write case log {}: {err}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info_span, warn};

    #[test]
    fn case_events_land_in_their_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let layer = CaseLogLayer::new(dir.path());
        let subscriber = tracing_subscriber::registry().with(layer.clone());

        tracing::subscriber::with_default(subscriber, || {
            warn!("outside any case");
            let span = info_span!("test_case", test = "AFCS.FSP.1");
            let _entered = span.enter();
            tracing::error!(severity = "fatal", "Response mask does not pass validation");
            warn!("vendor extension present");
            tracing::info!(severity = %"info", "Request passes validation.");
            debug!("not for the case log");
        });

        let log = fs::read_to_string(layer.log_path("AFCS.FSP.1")).unwrap();
        assert_eq!(
            log.lines().collect::<Vec<_>>(),
            vec![
                "(FATAL) Response mask does not pass validation",
                "(WARNING) vendor extension present",
                "(INFO) Request passes validation.",
            ]
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn display_recorded_names_map_to_safe_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let layer = CaseLogLayer::new(dir.path());
        let subscriber = tracing_subscriber::registry().with(layer.clone());
        let name = String::from("suite/AFCS.SRS.1");

        tracing::subscriber::with_default(subscriber, || {
            let span = info_span!("test_case", test = %name);
            let _entered = span.enter();
            warn!("first");
            warn!("second");
        });

        let path = layer.log_path(&name);
        assert_eq!(path, dir.path().join("suite_AFCS.SRS.1.log"));
        assert_eq!(fs::read_to_string(path).unwrap(), "(WARNING) first\n(WARNING) second\n");
    }

    #[test]
    fn init_creates_log_directory_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().join("nested/logs"),
            format: LogFormat::Pretty,
            file_prefix: Some("harness".into()),
            case_logs: true,
        };
        init_tracing("afc-test", &config).unwrap();
        assert!(config.directory.is_dir());
        init_tracing("afc-test", &config).unwrap();
    }
}
