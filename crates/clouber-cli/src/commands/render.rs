//! `clouber render`

use anyhow::Result;
use clouber_portal::{Portal, PortalConfig};
use std::path::Path;
use tracing::warn;

/// Navigate to `page` and print the aggregated HTML
pub async fn run(
    config: &PortalConfig,
    base_dir: Option<&Path>,
    page: &str,
    title: Option<&str>,
) -> Result<()> {
    let mut portal = Portal::from_config(config, base_dir)?;
    portal.register_all().await;

    let outcome = portal.navigate(page, title).await?;
    if outcome.failed > 0 {
        warn!(
            failed = outcome.failed,
            fetched = outcome.fetched,
            "some windows show error fragments"
        );
    }
    println!("{}", portal.render()?);
    Ok(())
}
