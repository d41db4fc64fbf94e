//! `nexus plugins` - inspect and validate plugins

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use comfy_table::Table;
use nexus_core::plugins::DESCRIPTOR_FILE;
use nexus_core::{FilePluginStore, MemoryEventBus, PluginHost, PluginHostConfig};
use nexus_plugin_api::{RawDescriptor, validate};

#[derive(Args)]
pub struct PluginsArgs {
    #[command(subcommand)]
    command: PluginsCommand,
}

#[derive(Subcommand)]
enum PluginsCommand {
    /// Run a load pass and list everything discovered
    List {
        /// Plugins directory (defaults to the XDG data dir)
        #[arg(long)]
        plugins_dir: Option<PathBuf>,
    },
    /// Validate one plugin directory's descriptor
    Validate {
        /// Path to the plugin directory
        dir: PathBuf,
    },
}

pub async fn run(args: PluginsArgs) -> Result<()> {
    match args.command {
        PluginsCommand::List { plugins_dir } => list(plugins_dir).await,
        PluginsCommand::Validate { dir } => validate_dir(&dir),
    }
}

async fn list(plugins_dir: Option<PathBuf>) -> Result<()> {
    let plugins_dir = plugins_dir.unwrap_or_else(nexus_paths::plugins_dir);
    let store = Arc::new(FilePluginStore::open(plugins_dir.join("catalog.toml"))?);
    let config = PluginHostConfig {
        plugins_dir,
        uploads_dir: nexus_paths::uploads_dir(),
    };
    let mut host = PluginHost::new(config, store, Arc::new(MemoryEventBus::new(1_000)));

    let report = host.load_all().await?;

    let mut table = Table::new();
    table.set_header(["NAME", "VERSION", "CATEGORY", "ROUTE", "ACTIVE", "FEATURED"]);
    for descriptor in host.registry().descriptors() {
        table.add_row([
            descriptor.name.clone(),
            descriptor.version.clone(),
            descriptor.category.to_string(),
            descriptor.route.clone(),
            descriptor.active.to_string(),
            descriptor.featured.to_string(),
        ]);
    }
    println!("{table}");
    println!(
        "{} plugins ({} active, {} errors, {}ms)",
        report.total, report.active, report.errors, report.duration_ms
    );
    Ok(())
}

fn validate_dir(dir: &PathBuf) -> Result<()> {
    let descriptor_path = dir.join(DESCRIPTOR_FILE);
    let content = std::fs::read_to_string(&descriptor_path)
        .with_context(|| format!("reading {}", descriptor_path.display()))?;
    let raw = RawDescriptor::from_toml(&content)
        .with_context(|| format!("parsing {}", descriptor_path.display()))?;

    match validate(&raw) {
        Ok(descriptor) => {
            println!("OK: {}", descriptor.identity());
            Ok(())
        }
        Err(issues) => {
            for issue in &issues {
                eprintln!("error: {issue}");
            }
            bail!("{} validation issue(s) in {}", issues.len(), dir.display());
        }
    }
}
