use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use trellis_config::{default_config_path, Config};
use trellis_index::{QueryResultEntry, SnapshotStorage, Trellis};

use crate::providers::{build_trellis, default_request};
use crate::{load_config, Cli, Commands, OutputFormat};

/// Run one command and return what should be printed on stdout.
pub async fn execute(cli: Cli) -> Result<String> {
    let config = load_config(&cli)?;
    let config_path = cli.config.clone();

    match cli.command {
        Commands::Ingest { file, text } => {
            let input = match (file, text) {
                (_, Some(text)) => text,
                (Some(path), None) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {:?}", path))?,
                (None, None) => {
                    let mut buf = String::new();
                    tokio::io::stdin()
                        .read_to_string(&mut buf)
                        .await
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            ingest(&config, &input).await
        }
        Commands::Query {
            query,
            mode,
            alpha,
            beta,
            k_anchors,
            max_hops,
            limit,
            format,
        } => {
            let mut request = default_request(&config, &query);
            if let Some(mode) = mode {
                request = request.with_mode(mode);
            }
            if let Some(alpha) = alpha {
                request = request.with_alpha(alpha);
            }
            if let Some(beta) = beta {
                request = request.with_beta(beta);
            }
            if let Some(k) = k_anchors {
                request = request.with_k_anchors(k);
            }
            if let Some(hops) = max_hops {
                request = request.with_max_hops(hops);
            }
            if let Some(limit) = limit {
                request = request.with_limit(limit);
            }

            let trellis = build_trellis(&config).await?;
            let cancel = CancellationToken::new();
            let watcher = {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupted, cancelling query");
                        cancel.cancel();
                    }
                })
            };
            let results = trellis.query_with_cancel(request, &cancel).await;
            watcher.abort();

            let results = results.context("Query failed")?;
            match format {
                OutputFormat::Json => Ok(serde_json::to_string_pretty(&results)?),
                OutputFormat::Text => Ok(render_table(&results)),
            }
        }
        Commands::Export { output } => {
            let trellis = build_trellis(&config).await?;
            let graph = serde_json::to_string_pretty(&trellis.export_graph().await)?;
            match output {
                Some(path) => {
                    write_file(&path, &graph).await?;
                    info!("Graph written to {:?}", path);
                    Ok(String::new())
                }
                None => Ok(graph),
            }
        }
        Commands::Stats => {
            let trellis = build_trellis(&config).await?;
            Ok(serde_json::to_string_pretty(&trellis.stats().await)?)
        }
        Commands::Remove { id } => {
            let trellis = build_trellis(&config).await?;
            if !trellis.remove_node(&id).await {
                bail!("No node with id '{}'", id);
            }
            let version = save(&trellis, &config).await?;
            Ok(serde_json::to_string_pretty(&json!({
                "removed": id,
                "version": version,
            }))?)
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("Refusing to reset without --yes");
            }
            let trellis = build_trellis(&config).await?;
            trellis.reset().await;
            let version = save(&trellis, &config).await?;
            Ok(serde_json::to_string_pretty(&json!({ "version": version }))?)
        }
        Commands::Snapshots => {
            let storage = SnapshotStorage::init(config.data_dir())
                .context("Failed to open snapshot storage")?;
            let snapshots = storage.list_snapshots().context("Failed to list snapshots")?;
            Ok(serde_json::to_string_pretty(&json!({
                "current": storage.version(),
                "snapshots": snapshots,
            }))?)
        }
        Commands::Rollback { version } => {
            let mut storage = SnapshotStorage::init(config.data_dir())
                .context("Failed to open snapshot storage")?;
            let saved = storage
                .rollback(version)
                .with_context(|| format!("Failed to roll back to v{}", version))?;
            // The restored state must open cleanly.
            let trellis = build_trellis(&config).await?;
            Ok(serde_json::to_string_pretty(&json!({
                "restored": version,
                "version": saved,
                "stats": trellis.stats().await,
            }))?)
        }
        Commands::Config { write: true } => {
            let path = config_path
                .or_else(default_config_path)
                .context("No config path given and no default config directory")?;
            config.save(&path)?;
            info!("Configuration written to {:?}", path);
            Ok(path.display().to_string())
        }
        Commands::Config { write: false } => {
            let mut shown = config.clone();
            for key in [&mut shown.embedding.api_key, &mut shown.extraction.api_key] {
                if key.is_some() {
                    *key = Some("***".to_string());
                }
            }
            shown.to_toml_string()
        }
    }
}

async fn ingest(config: &Config, input: &str) -> Result<String> {
    let trellis = build_trellis(config).await?;
    let report = trellis.ingest(input).await.context("Ingestion failed")?;
    info!(
        nodes_created = report.nodes_created,
        edges_created = report.edges_created,
        rejected = report.triples_rejected,
        "Batch {} ingested",
        report.batch_id
    );
    let version = save(&trellis, config).await?;
    Ok(serde_json::to_string_pretty(&json!({
        "report": report,
        "version": version,
    }))?)
}

async fn save(trellis: &Trellis, config: &Config) -> Result<u32> {
    let dir = config.data_dir();
    let version = trellis
        .save(&dir)
        .await
        .with_context(|| format!("Failed to save store to {:?}", dir))?;
    info!("Saved snapshot v{} to {:?}", version, dir);
    Ok(version)
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {:?}", path))
}

fn render_table(results: &[QueryResultEntry]) -> String {
    if results.is_empty() {
        return "No results".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:>7}  {:>7}  {:>7}  {:>3}  {}",
        "#", "final", "vector", "boost", "hop", "entity"
    );
    for (rank, r) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:>7.4}  {:>7.4}  {:>7.4}  {:>3}  {} ({}){}",
            rank + 1,
            r.final_score,
            r.vector_score,
            r.graph_boost,
            r.hop_distance,
            r.label,
            r.entity_type,
            if r.is_hidden_gem { "  *" } else { "" }
        );
    }
    out.trim_end().to_string()
}
