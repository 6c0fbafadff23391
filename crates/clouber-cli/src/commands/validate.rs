//! `clouber validate`

use anyhow::Result;
use clouber_portal::PortalConfig;

/// Print a summary of an already validated configuration
pub fn run(config: &PortalConfig) -> Result<()> {
    println!(
        "configuration ok: consumer '{}' ({}), {} producer(s), {} theme(s), {} page(s)",
        config.consumer.name,
        config.consumer.locale(),
        config.producers.len(),
        config.themes.len(),
        config.pages.len()
    );
    for producer in &config.producers {
        println!("  producer {} at {}", producer.id, producer.url());
    }
    for page in &config.pages {
        println!(
            "  page {} [{}]: {} region(s), {} window(s)",
            page.id,
            page.template,
            page.regions.len(),
            page.windows().count()
        );
    }
    Ok(())
}
