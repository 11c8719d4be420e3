//! In-memory `LimsClient` for algorithm tests: a scripted entity store
//! with fetch counters and per-batch routing failure plans.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use clarity_client::{
    strip_state, Artifact, Entity, InputOutputMap, LimsClient, LimsError, Process, Project,
    RoutingAction, Sample,
};

pub(crate) fn artifact(uri: &str, parent_process_uri: Option<&str>) -> Artifact {
    Artifact {
        uri: uri.to_string(),
        name: uri.rsplit('/').next().unwrap_or(uri).to_string(),
        kind: Default::default(),
        sample_uris: Vec::new(),
        parent_process_uri: parent_process_uri.map(str::to_string),
        container_uri: None,
        location: None,
        reagent_label: None,
        udf: Default::default(),
    }
}

pub(crate) struct RoutedBatch {
    pub target: String,
    pub uris: Vec<String>,
    pub action: RoutingAction,
}

struct FailurePlan {
    remaining: usize,
    transient: bool,
}

#[derive(Default)]
pub(crate) struct MockLims {
    entities: HashMap<String, Entity>,
    fetch_counts: Mutex<HashMap<String, usize>>,
    routed: Mutex<Vec<RoutedBatch>>,
    /// Keyed by a member uri: any submitted batch containing that uri
    /// fails `remaining` times before succeeding. Content-keyed so the
    /// scripts stay deterministic under concurrent submission order.
    routing_failures: Mutex<HashMap<String, FailurePlan>>,
}

impl MockLims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, entity: Entity) -> Self {
        self.entities
            .insert(strip_state(entity.uri()), entity);
        self
    }

    pub fn artifact(self, uri: &str, parent_process_uri: Option<&str>) -> Self {
        self.entity(Entity::Artifact(artifact(uri, parent_process_uri)))
    }

    pub fn sample(
        self,
        uri: &str,
        name: &str,
        project_uri: Option<&str>,
        artifact_uri: Option<&str>,
        control: bool,
    ) -> Self {
        self.entity(Entity::Sample(Sample {
            uri: uri.to_string(),
            name: name.to_string(),
            date_received: None,
            project_uri: project_uri.map(str::to_string),
            artifact_uri: artifact_uri.map(str::to_string),
            control,
            udf: Default::default(),
            project_name: None,
        }))
    }

    pub fn project(self, uri: &str, name: &str) -> Self {
        self.entity(Entity::Project(Project {
            uri: uri.to_string(),
            name: name.to_string(),
        }))
    }

    pub fn process(
        self,
        uri: &str,
        step_name: &str,
        date_run: Option<&str>,
        iomap: &[(&str, &str)],
    ) -> Self {
        let iomap = iomap
            .iter()
            .map(|(input, output)| InputOutputMap {
                input: input.to_string(),
                output: output.to_string(),
                output_kind: Default::default(),
                generation: Default::default(),
            })
            .collect();
        self.process_with_iomap(uri, step_name, date_run, iomap)
    }

    pub fn process_with_iomap(
        self,
        uri: &str,
        step_name: &str,
        date_run: Option<&str>,
        iomap: Vec<InputOutputMap>,
    ) -> Self {
        let date_run = date_run.map(|s| {
            s.parse::<DateTime<Utc>>()
                .expect("test date_run must be RFC 3339")
        });
        self.entity(Entity::Process(Process {
            uri: uri.to_string(),
            step_name: step_name.to_string(),
            technician: None,
            date_run,
            iomap,
            udf: Default::default(),
        }))
    }

    /// Any batch containing `uri` fails `times` submissions before
    /// succeeding (transient) or fails outright every time (fatal).
    pub fn fail_routing_containing(self, uri: &str, times: usize, transient: bool) -> Self {
        self.routing_failures.lock().unwrap().insert(
            uri.to_string(),
            FailurePlan {
                remaining: times,
                transient,
            },
        );
        self
    }

    pub fn fetch_count(&self, uri: &str) -> usize {
        self.fetch_counts
            .lock()
            .unwrap()
            .get(&strip_state(uri))
            .copied()
            .unwrap_or(0)
    }

    pub fn routed(&self) -> Vec<RoutedBatch> {
        std::mem::take(&mut *self.routed.lock().unwrap())
    }
}

#[async_trait]
impl LimsClient for MockLims {
    async fn fetch(&self, uri: &str) -> clarity_client::Result<Entity> {
        let key = strip_state(uri);
        *self.fetch_counts.lock().unwrap().entry(key.clone()).or_insert(0) += 1;
        self.entities
            .get(&key)
            .cloned()
            .ok_or_else(|| LimsError::NotFound {
                uri: uri.to_string(),
            })
    }

    async fn submit_routing(
        &self,
        target_step_uri: &str,
        artifact_uris: &[String],
        action: RoutingAction,
    ) -> clarity_client::Result<()> {
        {
            let mut failures = self.routing_failures.lock().unwrap();
            for uri in artifact_uris {
                if let Some(plan) = failures.get_mut(uri) {
                    if plan.transient {
                        if plan.remaining > 0 {
                            plan.remaining -= 1;
                            return Err(LimsError::Transient {
                                uri: target_step_uri.to_string(),
                                status: Some(503),
                                retry_after: None,
                            });
                        }
                    } else {
                        return Err(LimsError::Fatal {
                            uri: target_step_uri.to_string(),
                            status: 400,
                        });
                    }
                }
            }
        }
        self.routed.lock().unwrap().push(RoutedBatch {
            target: target_step_uri.to_string(),
            uris: artifact_uris.to_vec(),
            action,
        });
        Ok(())
    }
}
