//! `clouber describe`

use anyhow::{bail, Context, Result};
use clouber_portal::{Portal, PortalConfig};
use std::path::Path;

/// Register with the producers and list their portlets
pub async fn run(config: &PortalConfig, base_dir: Option<&Path>, only: Option<&str>) -> Result<()> {
    let mut portal = Portal::from_config(config, base_dir)?;

    let ids: Vec<String> = match only {
        Some(id) => {
            if portal.producer(id).is_none() {
                bail!("no producer '{id}' is configured");
            }
            vec![id.to_string()]
        }
        None => portal.producer_ids().map(str::to_string).collect(),
    };

    portal.register_all().await;

    for id in ids {
        let description = portal
            .describe(&id)
            .await
            .with_context(|| format!("describing producer '{id}'"))?;
        println!("{id}: {} portlet(s)", description.offered_portlets.len());
        for info in &description.offered_portlets {
            let modes: Vec<String> = info
                .supported_modes()
                .iter()
                .map(ToString::to_string)
                .collect();
            println!(
                "  {:<16} {:<24} [{}]",
                info.portlet_id(),
                info.title(),
                modes.join(", ")
            );
        }
    }
    Ok(())
}
