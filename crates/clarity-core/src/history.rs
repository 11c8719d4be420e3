use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use tracing::debug;

use clarity_client::{strip_state, Artifact, Entity, EntityCache, LimsClient};

use crate::config::WalkerConfig;
use crate::error::{ClarityError, Result};

// ─── HistoryWalker ────────────────────────────────────────────────────────

/// Resolves, for each current-step artifact, the corresponding artifact at
/// an earlier step of its history.
///
/// Step history is a DAG: each artifact has exactly one producing process,
/// but a process may consume many inputs, and the "same" step name runs as
/// many distinct processes over time (re-runs, re-plating, split batches).
/// A backward walk therefore branches, and every branch must be followed —
/// the first path to reach the target step is not necessarily the path the
/// sample most recently took.
pub struct HistoryWalker<'a, C: LimsClient + ?Sized> {
    client: &'a C,
    config: WalkerConfig,
}

impl<'a, C: LimsClient + ?Sized> HistoryWalker<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            config: WalkerConfig::default(),
        }
    }

    pub fn with_config(client: &'a C, config: WalkerConfig) -> Self {
        Self { client, config }
    }

    /// Map each of `current_artifacts` to its ancestor artifact at the step
    /// named `target_step`, or `None` when no history path reaches that
    /// step (a normal outcome — e.g. a re-plated sample that skipped it).
    ///
    /// Keys are state-stripped current-artifact uris. Walks for distinct
    /// artifacts run concurrently and share one entity cache; the first
    /// fetch error aborts the whole call, so callers never see a partial
    /// mapping.
    pub async fn get_artifacts_previous_step(
        &self,
        current_artifacts: &[Artifact],
        target_step: &str,
    ) -> Result<HashMap<String, Option<Artifact>>> {
        let cache = EntityCache::new();
        for artifact in current_artifacts {
            cache.prime(Entity::Artifact(artifact.clone()));
        }
        let cache = &cache;

        let mut walks = stream::iter(current_artifacts.iter().map(|artifact| async move {
            let matched = self.walk_one(cache, artifact, target_step).await?;
            Ok::<_, ClarityError>((strip_state(&artifact.uri), matched))
        }))
        .buffer_unordered(self.config.concurrency.max(1));

        let mut results = HashMap::with_capacity(current_artifacts.len());
        while let Some(walk) = walks.next().await {
            let (uri, matched) = walk?;
            results.insert(uri, matched);
        }
        Ok(results)
    }

    /// Walk one artifact's history backward, one process-hop per round.
    ///
    /// The frontier starts as the artifact itself. Each round, every
    /// frontier member whose producing process is a run of `target_step`
    /// becomes a candidate match and its path terminates; every other
    /// member is replaced by the union of its producing process's inputs.
    /// Paths reaching a root artifact (no producing process) just end.
    async fn walk_one(
        &self,
        cache: &EntityCache,
        start: &Artifact,
        target_step: &str,
    ) -> Result<Option<Artifact>> {
        let start_uri = strip_state(&start.uri);
        let mut frontier = vec![start_uri.clone()];
        let mut visited: HashSet<String> = frontier.iter().cloned().collect();
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut hops = 0usize;

        while !frontier.is_empty() {
            hops += 1;
            if hops > self.config.max_hops {
                return Err(ClarityError::HistoryDepthExceeded {
                    uri: start_uri,
                    hops: self.config.max_hops,
                });
            }

            let mut next = Vec::new();
            for artifact_uri in frontier.drain(..) {
                let entity = self.fetch(cache, &artifact_uri).await?;
                let artifact = entity.expect_artifact()?;

                let Some(process_uri) = artifact.parent_process_uri.as_deref() else {
                    // Root of history: this path ends without a match.
                    continue;
                };
                let process_entity = self.fetch(cache, process_uri).await?;
                let process = process_entity.expect_process()?;

                if process.step_name == target_step {
                    let position = process
                        .iomap
                        .iter()
                        .position(|io| strip_state(&io.output) == artifact_uri)
                        .unwrap_or(usize::MAX);
                    debug!(
                        artifact = %artifact_uri,
                        process = %process.uri,
                        date_run = ?process.date_run,
                        "history path reached target step"
                    );
                    candidates.push(Candidate {
                        artifact: artifact.clone(),
                        date_run: process.date_run,
                        position,
                    });
                    continue;
                }

                for io in &process.iomap {
                    let input = strip_state(&io.input);
                    if visited.insert(input.clone()) {
                        next.push(input);
                    }
                }
            }
            debug!(start = %start_uri, hop = hops, frontier = next.len(), "expanded history frontier");
            frontier = next;
        }

        Ok(pick_best(candidates))
    }

    async fn fetch(&self, cache: &EntityCache, uri: &str) -> Result<std::sync::Arc<Entity>> {
        cache
            .fetch(self.client, uri)
            .await
            .map_err(|source| ClarityError::Fetch {
                uri: uri.to_string(),
                source,
            })
    }
}

// ─── Candidate ranking ────────────────────────────────────────────────────

struct Candidate {
    artifact: Artifact,
    date_run: Option<DateTime<Utc>>,
    position: usize,
}

/// The search collects a match per divergent path; the surfaced answer is
/// the one from the most recently run process — that is the path the
/// sample actually, most currently, went through. Equal run times fall
/// back to iomap position (earlier wins); a process with no run time
/// orders after any dated one.
fn pick_best(mut candidates: Vec<Candidate>) -> Option<Artifact> {
    candidates.sort_by(|a, b| {
        b.date_run
            .cmp(&a.date_run)
            .then(a.position.cmp(&b.position))
    });
    candidates.into_iter().next().map(|c| c.artifact)
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{artifact, MockLims};

    const TARGET: &str = "Library Prep";

    /// A1 ← P2(in: [B1, B2]); B1 ← P1a (run @t1) at the target step;
    /// B2 ← P1b (run @t2 > t1) at the target step. The later run wins.
    fn divergent_history() -> MockLims {
        MockLims::new()
            .artifact("art/A1", Some("proc/P2"))
            .artifact("art/B1", Some("proc/P1a"))
            .artifact("art/B2", Some("proc/P1b"))
            .artifact("art/R1", None)
            .artifact("art/R2", None)
            .process(
                "proc/P2",
                "Normalization",
                Some("2024-06-01T08:00:00Z"),
                &[("art/B1", "art/A1"), ("art/B2", "art/A1")],
            )
            .process(
                "proc/P1a",
                TARGET,
                Some("2024-05-01T08:00:00Z"),
                &[("art/R1", "art/B1")],
            )
            .process(
                "proc/P1b",
                TARGET,
                Some("2024-05-20T08:00:00Z"),
                &[("art/R2", "art/B2")],
            )
    }

    #[tokio::test]
    async fn later_run_wins_across_divergent_paths() {
        let lims = divergent_history();
        let walker = HistoryWalker::new(&lims);

        let current = vec![artifact("art/A1", Some("proc/P2"))];
        let results = walker
            .get_artifacts_previous_step(&current, TARGET)
            .await
            .unwrap();

        let matched = results["art/A1"].as_ref().unwrap();
        assert_eq!(matched.uri, "art/B2");
    }

    #[tokio::test]
    async fn no_path_to_target_yields_none_not_error() {
        let lims = divergent_history();
        let walker = HistoryWalker::new(&lims);

        let current = vec![artifact("art/A1", Some("proc/P2"))];
        let results = walker
            .get_artifacts_previous_step(&current, "Sequencing")
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results["art/A1"].is_none());
    }

    #[tokio::test]
    async fn empty_input_yields_empty_mapping() {
        let lims = MockLims::new();
        let walker = HistoryWalker::new(&lims);
        let results = walker
            .get_artifacts_previous_step(&[], TARGET)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn equal_run_times_fall_back_to_iomap_position() {
        let t = Some("2024-05-01T08:00:00Z");
        let lims = MockLims::new()
            .artifact("art/A1", Some("proc/P2"))
            .artifact("art/B1", Some("proc/P1"))
            .artifact("art/B2", Some("proc/P1"))
            .artifact("art/R1", None)
            .process(
                "proc/P2",
                "Normalization",
                Some("2024-06-01T08:00:00Z"),
                &[("art/B2", "art/A1"), ("art/B1", "art/A1")],
            )
            .process(
                "proc/P1",
                TARGET,
                t,
                &[("art/R1", "art/B1"), ("art/R1", "art/B2")],
            );
        let walker = HistoryWalker::new(&lims);

        let current = vec![artifact("art/A1", Some("proc/P2"))];
        let results = walker
            .get_artifacts_previous_step(&current, TARGET)
            .await
            .unwrap();

        // Both B1 and B2 match through the same run; B1 sits earlier in
        // the process iomap.
        assert_eq!(results["art/A1"].as_ref().unwrap().uri, "art/B1");
    }

    #[tokio::test]
    async fn shared_ancestors_are_fetched_once() {
        // Two current artifacts converge on the same upstream process.
        let lims = MockLims::new()
            .artifact("art/A1", Some("proc/P2"))
            .artifact("art/A2", Some("proc/P3"))
            .artifact("art/B1", Some("proc/P1"))
            .artifact("art/R1", None)
            .process(
                "proc/P2",
                "Normalization",
                None,
                &[("art/B1", "art/A1")],
            )
            .process("proc/P3", "Pooling", None, &[("art/B1", "art/A2")])
            .process("proc/P1", TARGET, None, &[("art/R1", "art/B1")]);
        let walker = HistoryWalker::new(&lims);

        let current = vec![
            artifact("art/A1", Some("proc/P2")),
            artifact("art/A2", Some("proc/P3")),
        ];
        let results = walker
            .get_artifacts_previous_step(&current, TARGET)
            .await
            .unwrap();

        assert_eq!(results["art/A1"].as_ref().unwrap().uri, "art/B1");
        assert_eq!(results["art/A2"].as_ref().unwrap().uri, "art/B1");
        assert_eq!(lims.fetch_count("proc/P1"), 1);
        assert_eq!(lims.fetch_count("art/B1"), 1);
        // The current artifacts were primed into the cache, never fetched.
        assert_eq!(lims.fetch_count("art/A1"), 0);
    }

    #[tokio::test]
    async fn current_artifact_produced_by_target_matches_itself() {
        let lims = MockLims::new()
            .artifact("art/B1", Some("proc/P1"))
            .artifact("art/R1", None)
            .process("proc/P1", TARGET, None, &[("art/R1", "art/B1")]);
        let walker = HistoryWalker::new(&lims);

        let current = vec![artifact("art/B1", Some("proc/P1"))];
        let results = walker
            .get_artifacts_previous_step(&current, TARGET)
            .await
            .unwrap();
        assert_eq!(results["art/B1"].as_ref().unwrap().uri, "art/B1");
    }

    #[tokio::test]
    async fn missing_entity_aborts_the_whole_call() {
        // P2 references an input artifact the mock does not serve.
        let lims = MockLims::new()
            .artifact("art/A1", Some("proc/P2"))
            .process(
                "proc/P2",
                "Normalization",
                None,
                &[("art/GONE", "art/A1")],
            );
        let walker = HistoryWalker::new(&lims);

        let current = vec![artifact("art/A1", Some("proc/P2"))];
        let err = walker
            .get_artifacts_previous_step(&current, TARGET)
            .await
            .unwrap_err();
        match err {
            ClarityError::Fetch { uri, .. } => assert_eq!(uri, "art/GONE"),
            other => panic!("expected Fetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cyclic_history_hits_the_hop_bound() {
        // Corrupt data: A1's process consumes A1 itself. The visited set
        // absorbs the repeat, but a long chain would spin; force a tiny
        // bound via an artifact chain longer than max_hops.
        let lims = MockLims::new()
            .artifact("art/A1", Some("proc/P1"))
            .artifact("art/A2", Some("proc/P2"))
            .artifact("art/A3", Some("proc/P3"))
            .process("proc/P1", "Step1", None, &[("art/A2", "art/A1")])
            .process("proc/P2", "Step2", None, &[("art/A3", "art/A2")])
            .process("proc/P3", "Step3", None, &[("art/A1", "art/A3")]);
        let config = WalkerConfig {
            max_hops: 2,
            ..WalkerConfig::default()
        };
        let walker = HistoryWalker::with_config(&lims, config);

        let current = vec![artifact("art/A1", Some("proc/P1"))];
        let err = walker
            .get_artifacts_previous_step(&current, TARGET)
            .await
            .unwrap_err();
        assert!(matches!(err, ClarityError::HistoryDepthExceeded { .. }));
    }

    #[test]
    fn pick_best_prefers_dated_over_undated() {
        let dated = Candidate {
            artifact: artifact("art/B1", None),
            date_run: Some("2024-05-01T08:00:00Z".parse().unwrap()),
            position: 5,
        };
        let undated = Candidate {
            artifact: artifact("art/B2", None),
            date_run: None,
            position: 0,
        };
        let best = pick_best(vec![undated, dated]).unwrap();
        assert_eq!(best.uri, "art/B1");
    }

    #[test]
    fn pick_best_of_nothing_is_none() {
        assert!(pick_best(Vec::new()).is_none());
    }
}
