use anyhow::Context;
use clarity_client::HttpLimsClient;
use clarity_core::{RouterConfig, StepRouter};

use crate::output::print_json;

pub async fn run(
    client: &HttpLimsClient,
    config: RouterConfig,
    step_uri: &str,
    uris: &[String],
    unassign: bool,
    json: bool,
) -> anyhow::Result<()> {
    let router = StepRouter::with_config(client, config);
    let result = if unassign {
        router.unroute(uris, step_uri).await
    } else {
        router.route(uris, step_uri).await
    };
    let outcome = result.context("routing submission failed")?;

    if json {
        print_json(&outcome)?;
    } else {
        println!(
            "routed {} uri(s), skipped {} file(s)",
            outcome.routed.len(),
            outcome.skipped.len()
        );
        for batch in &outcome.failed {
            println!("failed batch ({} uris): {}", batch.uris.len(), batch.error);
        }
    }

    if !outcome.is_complete() {
        let failed = outcome.failed_uris().count();
        anyhow::bail!("{failed} uri(s) were not routed");
    }
    Ok(())
}
