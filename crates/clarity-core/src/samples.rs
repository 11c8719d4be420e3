use std::collections::{BTreeSet, HashMap};

use clarity_client::{strip_state, LimsClient, Sample};

use crate::error::{ClarityError, Result};

/// Fetch `uris` as [`Sample`] records.
///
/// With `project_info`, the distinct project uris of the batch are fetched
/// once and each sample's `project_name` is filled in. Control samples
/// have no project: their `project_uri` is cleared and never fetched.
pub async fn get_samples<C: LimsClient + ?Sized>(
    client: &C,
    uris: &[String],
    project_info: bool,
) -> Result<Vec<Sample>> {
    if uris.is_empty() {
        return Ok(Vec::new());
    }

    let entities = client.fetch_many(uris).await?;
    let mut samples = Vec::with_capacity(entities.len());
    for entity in &entities {
        let mut sample = entity.expect_sample()?.clone();
        if sample.control {
            sample.project_uri = None;
        }
        samples.push(sample);
    }

    if project_info {
        // BTreeSet: dedup plus a deterministic fetch order.
        let project_uris: Vec<String> = samples
            .iter()
            .filter_map(|s| s.project_uri.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if !project_uris.is_empty() {
            let mut names: HashMap<String, String> = HashMap::new();
            for entity in client.fetch_many(&project_uris).await? {
                let project = entity.expect_project()?;
                names.insert(project.uri.clone(), project.name.clone());
            }
            for sample in &mut samples {
                if let Some(project_uri) = &sample.project_uri {
                    sample.project_name = names.get(project_uri).cloned();
                }
            }
        }
    }

    Ok(samples)
}

/// Map each sample uri to its primary artifact uri (state-stripped).
/// A sample with no artifact is a data error the caller cannot proceed on.
pub async fn artifacts_from_samples<C: LimsClient + ?Sized>(
    client: &C,
    sample_uris: &[String],
) -> Result<HashMap<String, String>> {
    if sample_uris.is_empty() {
        return Ok(HashMap::new());
    }

    let entities = client.fetch_many(sample_uris).await?;
    let mut mapping = HashMap::with_capacity(entities.len());
    for entity in &entities {
        let sample = entity.expect_sample()?;
        let artifact_uri =
            sample
                .artifact_uri
                .as_deref()
                .ok_or_else(|| ClarityError::SampleWithoutArtifact {
                    uri: sample.uri.clone(),
                })?;
        mapping.insert(sample.uri.clone(), strip_state(artifact_uri));
    }
    Ok(mapping)
}

// ─── Tests ────────────────────────────────────────────────────────────────
