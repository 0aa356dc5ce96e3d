use anyhow::Context;
use clap::{Parser, Subcommand};
use spoke::codec;
use spoke::config::{self, ConfigError};
use spoke::events::ConfigEvent;
use spoke::item::{GameData, StaticCatalog};
use spoke::validate;
use spoke::{Engine, Settings};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "spokectl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of the per-user one
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Game data export (TOML) used to check item references
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Write the default configuration if none exists
    Init,
    /// List configured rings
    List,
    /// Report key bind conflicts and broken item references
    Validate,
    /// Print a share string for all rings, or for one ring by name
    Export {
        #[arg(short, long)]
        ring: Option<String>,
    },
    /// Import rings from a share string ("-" reads stdin)
    Import {
        blob: String,
        /// Append the imported rings to the config file
        #[arg(short, long)]
        write: bool,
    },
    /// Re-validate the configuration whenever it changes
    Watch,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let path = match cli.config {
        Some(path) => path,
        None => config::get_config_path()?,
    };

    match cli.command {
        Commands::Init => {
            config::write_default_config(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::List => list(&load(&path)?),
        Commands::Validate => {
            let catalog = load_catalog(cli.catalog.as_deref())?;
            let problems = report(&load(&path)?, &catalog);
            if problems > 0 {
                anyhow::bail!("{} problem(s) found in {}", problems, path.display());
            }
            println!("{} is valid", path.display());
            Ok(())
        }
        Commands::Export { ring } => {
            let settings = load(&path)?;
            let blob = match ring {
                Some(name) => {
                    let ring = settings
                        .rings
                        .find_by_name(&name)
                        .with_context(|| format!("No ring named '{}'", name))?;
                    codec::export_ring(ring)?
                }
                None => codec::export_rings(&settings.rings)?,
            };
            println!("{}", blob);
            Ok(())
        }
        Commands::Import { blob, write } => import(&path, &blob, write),
        Commands::Watch => {
            let catalog = load_catalog(cli.catalog.as_deref())?;
            watch(path, catalog)
        }
    }
}

fn load(path: &Path) -> Result<Settings, ConfigError> {
    config::load_config_from(path)
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<StaticCatalog> {
    let Some(path) = path else {
        return Ok(StaticCatalog::permissive());
    };
    let text = fs_err::read_to_string(path)?;
    StaticCatalog::from_toml_str(&text)
        .with_context(|| format!("Failed to parse catalog {}", path.display()))
}

fn list(settings: &Settings) -> anyhow::Result<()> {
    for (index, ring) in settings.rings.iter().enumerate() {
        let quick = ring
            .quick_action()
            .map(|(i, _)| format!(", quick action {}", i))
            .unwrap_or_default();
        println!(
            "{:>3}  {:<20} {:<24} {} item(s){}",
            index,
            ring.name,
            ring.key_bind.description(),
            ring.items.len(),
            quick
        );
    }
    Ok(())
}

/// Prints every problem and returns how many there were.
fn report(settings: &Settings, data: &dyn GameData) -> usize {
    let conflicts = validate::validate_key_binds(&settings.rings);
    let items = validate::validate_items(&settings.rings, data);
    for conflict in &conflicts {
        eprintln!("{}", conflict);
    }
    for item in &items {
        eprintln!("{}", item);
    }
    conflicts.len() + items.len()
}

fn import(path: &Path, blob: &str, write: bool) -> anyhow::Result<()> {
    let blob = if blob == "-" {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        input
    } else {
        blob.to_string()
    };

    let import = codec::import_rings(&blob).context("Import failed, nothing was added")?;
    for skipped in &import.skipped {
        eprintln!("{}", skipped);
    }
    for ring in &import.rings {
        println!("{} ({} item(s))", ring.name, ring.items.len());
    }

    if write {
        let mut settings = load(path)?;
        let added = settings.rings.append_imported(import.rings);
        config::save_settings(path, &settings)?;
        println!("Added {} ring(s) to {}", added, path.display());
    }
    Ok(())
}

fn watch(path: PathBuf, catalog: StaticCatalog) -> anyhow::Result<()> {
    let mut engine = Engine::new(config::load_or_default(&path));
    report(engine.settings(), &catalog);

    let rt = Runtime::new()?;
    rt.block_on(async {
        let (tx, rx) = async_channel::bounded(32);
        tokio::spawn(config::run_async_watcher(path.clone(), tx));

        while let Ok(ConfigEvent::Reload) = rx.recv().await {
            match load(&path) {
                Ok(settings) => {
                    log::info!("Reloaded {}", path.display());
                    engine.replace_settings(settings);
                    if report(engine.settings(), &catalog) == 0 {
                        println!("{}: {} ring(s), no problems", path.display(), engine.rings().len());
                    }
                }
                Err(e) => log::error!("Failed to reload {}: {}", path.display(), e),
            }
        }
    });
    Ok(())
}
