use std::collections::HashMap;

use clarity_client::{strip_state, Artifact, Generation, LimsClient};

use crate::error::Result;

/// Which side of a step execution's input-output map to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// The artifacts on one side of a step execution.
///
/// Outputs are limited to `per_input` generation: shared per-all-inputs
/// outputs (summary result files) carry no per-sample lineage and are not
/// step artifacts in any useful sense here. Inputs are taken as-is.
pub async fn step_artifacts<C: LimsClient + ?Sized>(
    client: &C,
    process_uri: &str,
    direction: Direction,
) -> Result<Vec<Artifact>> {
    let entity = client.fetch(process_uri).await?;
    let process = entity.expect_process()?;

    let mut uris: Vec<String> = Vec::new();
    for io in &process.iomap {
        let uri = match direction {
            Direction::Input => strip_state(&io.input),
            Direction::Output => {
                if io.generation != Generation::PerInput {
                    continue;
                }
                strip_state(&io.output)
            }
        };
        // One input maps to several outputs; keep each artifact once, in
        // iomap order.
        if !uris.contains(&uri) {
            uris.push(uri);
        }
    }

    if uris.is_empty() {
        return Ok(Vec::new());
    }
    let entities = client.fetch_many(&uris).await?;
    let mut artifacts = Vec::with_capacity(entities.len());
    for entity in &entities {
        artifacts.push(entity.expect_artifact()?.clone());
    }
    Ok(artifacts)
}

/// Input-artifact uri → its output-artifact uris for one step execution,
/// `per_input` pairs only, in iomap order.
pub async fn artifact_map<C: LimsClient + ?Sized>(
    client: &C,
    process_uri: &str,
) -> Result<HashMap<String, Vec<String>>> {
    let entity = client.fetch(process_uri).await?;
    let process = entity.expect_process()?;

    let mut mapping: HashMap<String, Vec<String>> = HashMap::new();
    for io in &process.iomap {
        if io.generation != Generation::PerInput {
            continue;
        }
        mapping
            .entry(strip_state(&io.input))
            .or_default()
            .push(strip_state(&io.output));
    }
    Ok(mapping)
}

// ─── Tests ────────────────────────────────────────────────────────────────
