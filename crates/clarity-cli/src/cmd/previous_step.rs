use anyhow::Context;
use clarity_client::HttpLimsClient;
use clarity_core::{steps, Direction, HistoryWalker, WalkerConfig};

use crate::output::{print_json, print_table};

pub async fn run(
    client: &HttpLimsClient,
    config: WalkerConfig,
    process_uri: &str,
    step_name: &str,
    direction: Direction,
    json: bool,
) -> anyhow::Result<()> {
    let current = steps::step_artifacts(client, process_uri, direction)
        .await
        .with_context(|| format!("failed to load artifacts of {process_uri}"))?;

    let walker = HistoryWalker::with_config(client, config);
    let results = walker
        .get_artifacts_previous_step(&current, step_name)
        .await
        .with_context(|| format!("history walk to step '{step_name}' failed"))?;

    if json {
        return print_json(&results);
    }

    let mut rows: Vec<Vec<String>> = results
        .iter()
        .map(|(uri, matched)| {
            vec![
                uri.clone(),
                matched
                    .as_ref()
                    .map(|a| a.uri.clone())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    rows.sort();
    print_table(&["ARTIFACT", "ANCESTOR"], &rows);
    Ok(())
}
