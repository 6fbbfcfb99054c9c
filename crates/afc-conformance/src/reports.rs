//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{errors::Result, harness::CaseVerdict};

const FILE_TIMESTAMP: &str = "%Y-%m-%d_%H-%M-%S";

/// Writes a received response body to `<dir>/<test>_response_<timestamp>.json`.
pub fn write_response_artifact(
    output_dir: &Path,
    test_name: &str,
    body: &serde_json::Value,
    at: DateTime<Utc>,
) -> Result<PathBuf> {
    ensure_dir(output_dir)?;
    let path = output_dir.join(format!(
        "{test_name}_response_{}.json",
        at.format(FILE_TIMESTAMP)
    ));
    write_json(&path, body)?;
    info!(test = test_name, path = %path.display(), "response saved");
    Ok(path)
}

#[derive(Debug)]
pub struct VerdictExporter<'a> {
    verdict: &'a CaseVerdict,
}

impl<'a> VerdictExporter<'a> {
    pub fn new(verdict: &'a CaseVerdict) -> Self {
        Self { verdict }
    }

    /// Writes `<dir>/<test>_verdict_<timestamp>.json` and returns its path.
    pub fn export(&self, output_dir: &Path, at: DateTime<Utc>) -> Result<PathBuf> {
        ensure_dir(output_dir)?;
        let timestamp = at.to_rfc3339();
        let envelope = ReportEnvelope::new(
            &timestamp,
            &self.verdict.test_name,
            self.verdict.outcome.as_str(),
            verdict_schema(),
            self.verdict,
        );
        let path = output_dir.join(format!(
            "{}_verdict_{}.json",
            self.verdict.test_name,
            at.format(FILE_TIMESTAMP)
        ));
        write_json(&path, &envelope)?;
        info!(test = %self.verdict.test_name, path = %path.display(), "verdict exported");
        Ok(path)
    }
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    test_name: &'a str,
    outcome: &'static str,
    schema: serde_json::Value,
    data: &'a T,
}

impl<'a, T: Serialize> ReportEnvelope<'a, T> {
    fn new(
        timestamp: &'a str,
        test_name: &'a str,
        outcome: &'static str,
        schema: serde_json::Value,
        data: &'a T,
    ) -> Self {
        Self {
            timestamp,
            test_name,
            outcome,
            schema,
            data,
        }
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let mut serialized = serde_json::to_string_pretty(value)?;
    serialized.push('\n');
    fs::write(path, serialized)?;
    Ok(())
}

fn verdict_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "CaseVerdict",
        "type": "object",
        "properties": {
            "test_name": {"type": "string"},
            "outcome": {"enum": ["expected", "unexpected", "skipped"]},
            "http_status": {"type": ["integer", "null"]},
            "violations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "severity": {"enum": ["info", "warning", "error", "fatal"]},
                        "message": {"type": "string"}
                    },
                    "required": ["severity", "message"]
                }
            }
        },
        "required": ["test_name", "outcome", "violations"]
    })
}
