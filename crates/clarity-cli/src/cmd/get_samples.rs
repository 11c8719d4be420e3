use anyhow::Context;
use clarity_client::HttpLimsClient;
use clarity_core::samples;

use crate::output::{print_json, print_table};

pub async fn run(
    client: &HttpLimsClient,
    uris: &[String],
    project_info: bool,
    json: bool,
) -> anyhow::Result<()> {
    let samples = samples::get_samples(client, uris, project_info)
        .await
        .context("failed to fetch samples")?;

    if json {
        return print_json(&samples);
    }

    let rows: Vec<Vec<String>> = samples
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.project_name.clone().unwrap_or_else(|| "-".to_string()),
                s.date_received
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                s.uri.clone(),
            ]
        })
        .collect();
    print_table(&["NAME", "PROJECT", "RECEIVED", "URI"], &rows);
    Ok(())
}
