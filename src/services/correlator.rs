//! Correlates a failure reason with the workflow definition that produced it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::DefinitionDoc;

/// Line text reported when no line matched.
pub const LINE_NOT_FOUND: &str = "Error location not found";

/// Job reported when no job or step matched.
pub const UNKNOWN_JOB: &str = "Unknown job";

/// Line-search rules, tried in order over every line before the next rule.
enum LineRule {
    /// Line contains the failure reason itself.
    ContainsReason,
    /// Line contains one of the given lowercase markers.
    ContainsAny(&'static [&'static str]),
}

const LINE_RULES: &[LineRule] = &[
    LineRule::ContainsReason,
    LineRule::ContainsAny(&["error:", "failed:"]),
    LineRule::ContainsAny(&["run:", "uses:"]),
];

impl LineRule {
    /// `reason` is already lowercased. An empty reason never matches.
    fn matches(&self, lowered_line: &str, reason: &str) -> bool {
        match self {
            LineRule::ContainsReason => !reason.is_empty() && lowered_line.contains(reason),
            LineRule::ContainsAny(markers) => markers.iter().any(|m| lowered_line.contains(m)),
        }
    }
}

/// Where in the definition a failure most likely originated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correlation {
    /// 1-based line number; `None` when no rule matched.
    pub line: Option<usize>,
    pub line_text: String,
    pub job: String,
}

impl Correlation {
    /// Result used when no definition text could be obtained.
    pub fn unavailable() -> Self {
        Self {
            line: None,
            line_text: LINE_NOT_FOUND.to_string(),
            job: UNKNOWN_JOB.to_string(),
        }
    }
}

/// Find the line most likely responsible for `reason`.
pub fn find_error_location(definition: &str, reason: &str) -> (Option<usize>, String) {
    let reason = reason.trim().to_lowercase();
    let lowered: Vec<String> = definition.lines().map(str::to_lowercase).collect();

    for rule in LINE_RULES {
        if let Some(index) = lowered.iter().position(|line| rule.matches(line, &reason)) {
            let text = definition.lines().nth(index).unwrap_or_default().trim();
            return (Some(index + 1), text.to_string());
        }
    }

    (None, LINE_NOT_FOUND.to_string())
}

/// Find the job (or `job - step`) named in `reason`.
///
/// Job IDs are checked across all jobs before any step name. Unnamed steps
/// never match.
pub fn find_failed_job(doc: &DefinitionDoc, reason: &str) -> Option<String> {
    let reason = reason.to_lowercase();

    if let Some(job_id) = doc
        .jobs
        .keys()
        .find(|job_id| !job_id.is_empty() && reason.contains(&job_id.to_lowercase()))
    {
        return Some(job_id.clone());
    }

    doc.jobs.iter().find_map(|(job_id, job)| {
        job.steps.iter().find_map(|step| {
            let name = step.name.as_deref()?.trim();
            (!name.is_empty() && reason.contains(&name.to_lowercase()))
                .then(|| format!("{} - {}", job_id, name))
        })
    })
}

/// Locate line and job for `reason`. A definition that does not parse yields
/// [`Correlation::unavailable`].
pub fn correlate(definition: &str, reason: &str) -> Correlation {
    let doc = match DefinitionDoc::parse(definition) {
        Ok(doc) => doc,
        Err(e) => {
            debug!("Workflow definition is not valid YAML: {}", e);
            return Correlation::unavailable();
        }
    };

    let (line, line_text) = find_error_location(definition, reason);

    Correlation {
        line,
        line_text,
        job: find_failed_job(&doc, reason).unwrap_or_else(|| UNKNOWN_JOB.to_string()),
    }
}
