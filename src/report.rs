// Per-resource outcomes of a fetch or upload run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::{ResourceKind, TemplateResource};
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Fetch,
    Upload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded { files: Vec<PathBuf> },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceOutcome {
    pub id: u32,
    pub slug: &'static str,
    pub kind: ResourceKind,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ResourceOutcome {
    pub fn succeeded(resource: &TemplateResource, files: Vec<PathBuf>) -> Self {
        Self::new(resource, OutcomeStatus::Succeeded { files })
    }

    pub fn skipped(resource: &TemplateResource, reason: impl Into<String>) -> Self {
        Self::new(resource, OutcomeStatus::Skipped { reason: reason.into() })
    }

    pub fn failed(resource: &TemplateResource, error: &SyncError) -> Self {
        Self::new(resource, OutcomeStatus::Failed { error: error.to_string() })
    }

    fn new(resource: &TemplateResource, status: OutcomeStatus) -> Self {
        ResourceOutcome {
            id: resource.id,
            slug: resource.slug,
            kind: resource.kind,
            status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub operation: Operation,
    pub template_id: String,
    pub outcomes: Vec<ResourceOutcome>,
}

impl RunReport {
    pub fn new(operation: Operation, template_id: impl Into<String>) -> Self {
        RunReport {
            operation,
            template_id: template_id.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: ResourceOutcome) {
        self.outcomes.push(outcome);
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Succeeded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.operation {
            Operation::Fetch => "fetch",
            Operation::Upload => "upload",
        };
        writeln!(
            f,
            "{} of template {}: {} succeeded, {} skipped, {} failed",
            verb,
            self.template_id,
            self.succeeded(),
            self.skipped(),
            self.failed()
        )?;
        for o in &self.outcomes {
            let label = format!("{}_{}", o.id, o.slug);
            match &o.status {
                OutcomeStatus::Succeeded { files } => {
                    let names: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
                    writeln!(f, "  ok      {:<40} {}", label, names.join(", "))?;
                }
                OutcomeStatus::Skipped { reason } => writeln!(f, "  skipped {:<40} {}", label, reason)?,
                OutcomeStatus::Failed { error } => writeln!(f, "  FAILED  {:<40} {}", label, error)?,
            }
        }
        Ok(())
    }
}
