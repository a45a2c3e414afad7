//! Builds a runtime from content on disk.
use anyhow::{Context, Result};

use ledger_content::ContentFactory;
use runtime::{Runtime, RuntimeConfig};

use crate::config::ServerConfig;

pub async fn build_runtime(config: &ServerConfig) -> Result<Runtime> {
    let factory = ContentFactory::new(config.data_dir.clone());
    let ledger = factory.load_config()?;
    let catalog = factory.load_catalog()?;
    tracing::info!(
        data_dir = %factory.data_dir().display(),
        templates = catalog.len(),
        claim_ttl = ledger.claim_ttl,
        "Content loaded"
    );

    let runtime_config = RuntimeConfig {
        ledger,
        event_buffer_size: config.event_buffer,
        command_buffer_size: config.command_buffer,
        tick_interval: config.tick_interval,
    };

    Runtime::builder()
        .config(runtime_config)
        .catalog(catalog)
        .build()
        .await
        .context("Failed to start runtime")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn builds_from_a_content_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("items.ron"),
            r#"(items: [(template_id: "Wood", max_stack_size: 20, tags: ["Item.Resource.Wood"])])"#,
        )
        .unwrap();
        fs::write(dir.path().join("config.toml"), "claim_ttl = 4\n").unwrap();

        let config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let runtime = build_runtime(&config).await.unwrap();
        let handle = runtime.handle();
        let bag = handle
            .create_actor_container(ledger_core::ActorId(1))
            .await
            .unwrap();
        assert!(handle.debug_view(bag).await.unwrap().contains("seq=0"));
        runtime.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn missing_catalog_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        assert!(build_runtime(&config).await.is_err());
    }
}
