//! Batch runs over several studies.

use super::study::{Orchestrator, StudyDriver, StudyPlan};
use crate::error::DriverError;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudyOutcome {
    pub study: String,
    pub started_utc: String,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub status: StudyStatus,
    /// Error of a failed study.
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<StudyOutcome>,
    /// Set when a fatal error stopped the batch before every study ran.
    pub aborted: Option<String>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == StudyStatus::Failed)
            .count()
    }

    /// One line per study plus a totals line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .outcomes
            .iter()
            .map(|o| {
                let status = match o.status {
                    StudyStatus::Completed => "ok",
                    StudyStatus::Failed => "FAILED",
                };
                let elapsed = humantime::format_duration(Duration::from_secs(o.elapsed.as_secs()));
                match o.message.as_deref() {
                    Some(msg) => format!("{:<40} {status:<6} {elapsed}  {msg}", o.study),
                    None => format!("{:<40} {status:<6} {elapsed}", o.study),
                }
            })
            .collect();
        lines.push(format!(
            "{} studies, {} completed, {} failed",
            self.outcomes.len(),
            self.outcomes.len() - self.failed(),
            self.failed()
        ));
        if let Some(reason) = self.aborted.as_deref() {
            lines.push(format!("Batch aborted: {reason}"));
        }
        lines
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create report directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
        Ok(())
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Run every plan in order, then exit the tool.
///
/// A failed study is recorded and the batch moves on; a fatal error (the tool
/// cannot be started) stops the batch.
pub fn run_batch<D: StudyDriver>(
    driver: &mut D,
    orchestrator: &Orchestrator,
    plans: &[StudyPlan],
) -> BatchReport {
    let mut report = BatchReport::default();
    for (idx, plan) in plans.iter().enumerate() {
        info!(study = %plan.study, "study {}/{}", idx + 1, plans.len());
        let started_utc = now_rfc3339();
        let start = Instant::now();
        let result = orchestrator.run_scenario(driver, plan);
        let elapsed = start.elapsed();

        let (status, message) = match &result {
            Ok(()) => (StudyStatus::Completed, None),
            Err(e) => {
                let message = e.to_string();
                error!(study = %plan.study, kind = e.kind(), "study failed: {message}");
                (StudyStatus::Failed, Some(message))
            }
        };
        report.outcomes.push(StudyOutcome {
            study: plan.study.clone(),
            started_utc,
            elapsed,
            status,
            message: message.clone(),
        });

        if let Err(e) = &result {
            if e.is_fatal() {
                report.aborted = message;
                break;
            }
        }
    }

    if let Err(e) = driver.close_inm() {
        warn!(kind = e.kind(), "failed to exit INM: {e}");
    }
    report
}
