use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use colored::Colorize;
use pixa_store::{
    AssetId, AssetRecord, AssetStore, AssetUpload, CustomMetadata, FileCatalog, FsBlobRepository,
    StoreOutcome, SweepOptions,
};
use serde::Serialize;
use tracing::debug;

use crate::cli::*;
use crate::config::{PixaConfig, CONFIG_FILE};

pub async fn run_command(cli: Cli, config: PixaConfig) -> anyhow::Result<()> {
    let out = Output(cli.format);
    match cli.command {
        Command::Init => cmd_init(&config, out),
        Command::Put(args) => cmd_put(&open_store(&config).await?, args, out).await,
        Command::Get(args) => cmd_get(&open_store(&config).await?, args, out).await,
        Command::Info(args) => cmd_info(&open_store(&config).await?, args, out).await,
        Command::Rm(args) => cmd_rm(&open_store(&config).await?, args, out).await,
        Command::Ls(args) => cmd_ls(&open_store(&config).await?, &config, args, out).await,
        Command::Tag(args) => cmd_tag(&open_store(&config).await?, args, out).await,
        Command::Meta(args) => cmd_meta(&open_store(&config).await?, args, out).await,
        Command::Stats => cmd_stats(&open_store(&config).await?, out).await,
        Command::Gc(args) => cmd_gc(&open_store(&config).await?, args, out).await,
        Command::Fsck => cmd_fsck(&open_store(&config).await?, out).await,
    }
}

async fn open_store(config: &PixaConfig) -> anyhow::Result<AssetStore> {
    let blobs = FsBlobRepository::open(config.blobs_dir())
        .await
        .with_context(|| format!("opening blob directory {}", config.blobs_dir().display()))?;
    let catalog = FileCatalog::open(config.catalog_path())
        .await
        .with_context(|| format!("opening catalog {}", config.catalog_path().display()))?;
    debug!(root = %config.root.display(), "store opened");
    Ok(AssetStore::new(Arc::new(blobs), Arc::new(catalog)).with_config(config.store_config()))
}

#[derive(Clone, Copy)]
struct Output(OutputFormat);

impl Output {
    /// Print `value` as JSON, or run `text` for the human-readable form.
    fn emit<T: Serialize>(self, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
        match self.0 {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Text => text(),
        }
        Ok(())
    }
}

fn parse_id(raw: &str) -> anyhow::Result<AssetId> {
    raw.parse().with_context(|| format!("invalid asset id {raw:?}"))
}

fn parse_metadata(pairs: &[String]) -> anyhow::Result<CustomMetadata> {
    let mut metadata = CustomMetadata::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("metadata must be key=value, got {pair:?}");
        };
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        metadata.insert(key.to_string(), value);
    }
    Ok(metadata)
}

fn human_size(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{size:.0} {}", UNITS[0])
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

fn print_record(r: &AssetRecord) {
    println!("{} {}", "asset".bold(), r.asset_id.to_string().yellow().bold());
    println!("  Name:        {}", r.original_name);
    println!("  Type:        {}", r.media_type.cyan());
    println!("  Size:        {} ({} bytes)", human_size(r.size_bytes as f64), r.size_bytes);
    println!("  Fingerprint: {}", r.fingerprint.to_string().dimmed());
    println!("  Storage key: {}", r.storage_key.to_string().dimmed());
    if !r.tags.is_empty() {
        println!("  Tags:        {}", r.tags.join(", ").green());
    }
    for (k, v) in &r.custom_metadata {
        println!("  {}: {}", k.bold(), v);
    }
    println!("  Created:     {}", r.created_at.to_rfc3339());
    println!("  Updated:     {}", r.updated_at.to_rfc3339());
}

fn cmd_init(config: &PixaConfig, out: Output) -> anyhow::Result<()> {
    std::fs::create_dir_all(config.blobs_dir())
        .with_context(|| format!("creating {}", config.blobs_dir().display()))?;
    let path = config.root.join(CONFIG_FILE);
    let created = !path.exists();
    if created {
        std::fs::write(&path, config.to_toml()?)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    #[derive(Serialize)]
    struct Init<'a> {
        root: &'a std::path::Path,
        config_created: bool,
    }
    out.emit(&Init { root: &config.root, config_created: created }, || {
        println!("{} Initialized Pixa store in {}", "✓".green().bold(), config.root.display().to_string().bold());
        if !created {
            println!("  Kept existing {}", CONFIG_FILE);
        }
    })
}

async fn cmd_put(store: &AssetStore, args: PutArgs, out: Output) -> anyhow::Result<()> {
    let upload = AssetUpload {
        original_name: String::new(),
        tags: args.tags,
        custom_metadata: parse_metadata(&args.meta)?,
    };
    let outcome = store
        .store_file(&args.file, upload)
        .await
        .with_context(|| format!("storing {}", args.file.display()))?;

    #[derive(Serialize)]
    struct Put<'a> {
        asset_id: &'a AssetId,
        duplicate: bool,
    }
    out.emit(
        &Put { asset_id: outcome.asset_id(), duplicate: outcome.is_duplicate() },
        || match &outcome {
            StoreOutcome::Stored(id) => println!("{} Stored {}", "✓".green().bold(), id.to_string().yellow()),
            StoreOutcome::AlreadyExists(id) => println!(
                "{} Already stored as {}",
                "=".cyan().bold(),
                id.to_string().yellow()
            ),
        },
    )
}

async fn cmd_get(store: &AssetStore, args: GetArgs, out: Output) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let bytes = store.download_to_path(&id, &args.out).await?;
    #[derive(Serialize)]
    struct Get<'a> {
        asset_id: &'a AssetId,
        path: &'a std::path::Path,
        bytes: u64,
    }
    out.emit(&Get { asset_id: &id, path: &args.out, bytes }, || {
        println!("{} Wrote {} to {}", "✓".green().bold(), human_size(bytes as f64), args.out.display());
    })
}

async fn cmd_info(store: &AssetStore, args: IdArgs, out: Output) -> anyhow::Result<()> {
    let record = store.get_asset_meta(&parse_id(&args.id)?).await?;
    out.emit(&record, || print_record(&record))
}

async fn cmd_rm(store: &AssetStore, args: IdArgs, out: Output) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    store.delete_asset(&id).await?;
    out.emit(&serde_json::json!({ "deleted": id }), || {
        println!("Deleted {}", id.to_string().yellow());
    })
}

async fn cmd_ls(store: &AssetStore, config: &PixaConfig, args: LsArgs, out: Output) -> anyhow::Result<()> {
    let limit = args.limit.unwrap_or(config.default_list_limit);
    let records = store.list_assets(&args.tags, limit, args.offset).await?;
    out.emit(&records, || {
        if records.is_empty() {
            println!("No assets.");
        }
        for r in &records {
            println!(
                "{}  {:>10}  {:<14} {}{}",
                r.asset_id.to_string().yellow(),
                human_size(r.size_bytes as f64),
                r.media_type.cyan(),
                r.original_name,
                if r.tags.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", r.tags.join(", ")).green().to_string()
                }
            );
        }
    })
}

async fn cmd_tag(store: &AssetStore, args: TagArgs, out: Output) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    store.update_tags(&id, args.tags.clone()).await?;
    out.emit(&serde_json::json!({ "asset_id": id, "tags": args.tags }), || {
        println!("Tagged {} with [{}]", id.to_string().yellow(), args.tags.join(", ").green());
    })
}

async fn cmd_meta(store: &AssetStore, args: MetaArgs, out: Output) -> anyhow::Result<()> {
    let id = parse_id(&args.id)?;
    let metadata = parse_metadata(&args.pairs)?;
    store.update_metadata(&id, metadata.clone()).await?;
    out.emit(&serde_json::json!({ "asset_id": id, "custom_metadata": metadata }), || {
        println!("Updated metadata on {} ({} keys)", id.to_string().yellow(), metadata.len());
    })
}

async fn cmd_stats(store: &AssetStore, out: Output) -> anyhow::Result<()> {
    let stats = store.stats().await?;
    out.emit(&stats, || {
        println!("Assets:       {}", stats.total_count.to_string().bold());
        println!("Total size:   {} ({} bytes)", human_size(stats.total_size as f64), stats.total_size);
        println!("Average size: {}", human_size(stats.avg_size));
    })
}

async fn cmd_gc(store: &AssetStore, args: GcArgs, out: Output) -> anyhow::Result<()> {
    let options = SweepOptions {
        dry_run: args.dry_run,
        grace: Duration::from_secs(args.grace_secs),
    };
    let report = store.sweep_orphans(options).await?;
    out.emit(&report, || {
        let verb = if args.dry_run { "would remove" } else { "removed" };
        let count = if args.dry_run { report.orphans_found } else { report.orphans_removed };
        println!(
            "{} GC: scanned {} blobs, {} {} orphans",
            "✓".green(),
            report.scanned,
            verb,
            count.to_string().bold()
        );
        if report.incomplete_writes > 0 {
            println!("  {} {} incomplete writes", verb, report.incomplete_writes);
        }
        for f in &report.failures {
            println!("  {} {}: {}", "✗".red(), f.storage_key, f.error);
        }
    })?;
    if !report.failures.is_empty() {
        bail!("{} blobs could not be swept", report.failures.len());
    }
    Ok(())
}

async fn cmd_fsck(store: &AssetStore, out: Output) -> anyhow::Result<()> {
    let report = store.audit_integrity().await?;
    out.emit(&report, || {
        if report.is_clean() {
            println!("{} {} records checked, no issues.", "✓".green().bold(), report.checked);
        } else {
            for id in &report.missing {
                println!("  {} {} has no blob", "✗".red(), id.to_string().yellow());
            }
        }
    })?;
    if !report.is_clean() {
        bail!("{} of {} records reference missing blobs", report.missing.len(), report.checked);
    }
    Ok(())
}
