use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LimsError;

/// Limsid namespace the vendor reserves for file artifacts. File uris are
/// not routable and carry no sample lineage.
const FILE_LIMSID_PREFIX: &str = "92-";

// ─── Entity ───────────────────────────────────────────────────────────────

/// Every entity the LIMS serves, discriminated by the JSON `"type"` field.
///
/// Entities are immutable snapshots: refreshed by re-fetch, never mutated
/// in place. All cross-entity references are uris, resolved lazily through
/// the client, so there are no recursive object graphs to manage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    Artifact(Artifact),
    Sample(Sample),
    Project(Project),
    Process(Process),
    Step(Step),
}

impl Entity {
    pub fn uri(&self) -> &str {
        match self {
            Entity::Artifact(a) => &a.uri,
            Entity::Sample(s) => &s.uri,
            Entity::Project(p) => &p.uri,
            Entity::Process(p) => &p.uri,
            Entity::Step(s) => &s.uri,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Entity::Artifact(_) => "artifact",
            Entity::Sample(_) => "sample",
            Entity::Project(_) => "project",
            Entity::Process(_) => "process",
            Entity::Step(_) => "step",
        }
    }

    pub fn as_artifact(&self) -> Option<&Artifact> {
        match self {
            Entity::Artifact(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_process(&self) -> Option<&Process> {
        match self {
            Entity::Process(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_sample(&self) -> Option<&Sample> {
        match self {
            Entity::Sample(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_project(&self) -> Option<&Project> {
        match self {
            Entity::Project(p) => Some(p),
            _ => None,
        }
    }

    pub fn expect_artifact(&self) -> Result<&Artifact, LimsError> {
        self.as_artifact().ok_or_else(|| self.kind_error("artifact"))
    }

    pub fn expect_process(&self) -> Result<&Process, LimsError> {
        self.as_process().ok_or_else(|| self.kind_error("process"))
    }

    pub fn expect_sample(&self) -> Result<&Sample, LimsError> {
        self.as_sample().ok_or_else(|| self.kind_error("sample"))
    }

    pub fn expect_project(&self) -> Result<&Project, LimsError> {
        self.as_project().ok_or_else(|| self.kind_error("project"))
    }

    fn kind_error(&self, expected: &'static str) -> LimsError {
        LimsError::UnexpectedKind {
            uri: self.uri().to_string(),
            expected,
            got: self.kind_name(),
        }
    }
}

// ─── Artifact ─────────────────────────────────────────────────────────────

/// A tracked item within a lab step: an analyte, a result file, a pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artifact {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub kind: ArtifactKind,
    /// Samples this artifact derives from, in lineage order.
    #[serde(default)]
    pub sample_uris: Vec<String>,
    /// The process (step execution) that produced this artifact. Absent on
    /// root artifacts that entered the system without a producing step.
    #[serde(default)]
    pub parent_process_uri: Option<String>,
    #[serde(default)]
    pub container_uri: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub reagent_label: Option<String>,
    #[serde(default)]
    pub udf: HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    #[default]
    Analyte,
    ResultFile,
    /// Any vendor kind this client has no special handling for.
    #[serde(other)]
    Other,
}

// ─── Sample ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Sample {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub date_received: Option<NaiveDate>,
    #[serde(default)]
    pub project_uri: Option<String>,
    /// The sample's primary (0th) artifact.
    #[serde(default)]
    pub artifact_uri: Option<String>,
    /// Control samples have no project association.
    #[serde(default)]
    pub control: bool,
    #[serde(default)]
    pub udf: HashMap<String, Value>,
    /// Resolved client-side from `project_uri`; never on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Project {
    pub uri: String,
    pub name: String,
}

// ─── Process ──────────────────────────────────────────────────────────────

/// One execution of a workflow step.
///
/// Several processes can share a `step_name`: samples pass through the same
/// step at different times (re-runs, re-plating, split batches). That is
/// what makes backward history traversal branch.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Process {
    pub uri: String,
    /// The configured name of the step this process is a run of.
    pub step_name: String,
    #[serde(default)]
    pub technician: Option<String>,
    /// When this run happened; orders divergent history paths.
    #[serde(default)]
    pub date_run: Option<DateTime<Utc>>,
    /// Input→output artifact pairs, in the step's working order.
    #[serde(default)]
    pub iomap: Vec<InputOutputMap>,
    #[serde(default)]
    pub udf: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputOutputMap {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub output_kind: ArtifactKind,
    #[serde(default)]
    pub generation: Generation,
}

/// How a process output relates to its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Generation {
    /// One output per input artifact.
    #[default]
    PerInput,
    /// One shared output for the whole step (e.g. a summary file).
    PerAllInputs,
}

// ─── Step ─────────────────────────────────────────────────────────────────

/// A workflow step definition — the target of routing requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Step {
    pub uri: String,
    pub name: String,
}

// ─── Uri helpers ──────────────────────────────────────────────────────────

/// Drop the `?state=...` suffix the LIMS appends to artifact uris. Two uris
/// for the same artifact at different states must compare equal everywhere
/// in this crate.
pub fn strip_state(uri: &str) -> String {
    uri.split('?').next().unwrap_or(uri).to_string()
}

/// The limsid is the final path segment of a (state-stripped) uri.
pub fn limsid(uri: &str) -> &str {
    let base = uri.split('?').next().unwrap_or(uri);
    base.rsplit('/').next().unwrap_or(base)
}

/// File artifacts live in the `92-` limsid namespace and are not routable.
pub fn is_file_uri(uri: &str) -> bool {
    limsid(uri).starts_with(FILE_LIMSID_PREFIX)
}

// ─── Tests ────────────────────────────────────────────────────────────────
