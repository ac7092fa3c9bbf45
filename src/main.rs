//! `foamcase` command line: prepare a case from a TOML description, inspect
//! dictionary files, list the preset recipes.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use foamcase::config::load_config_from_file;
use foamcase::recipe::{RecipeKind, RecipeOverrides};
use foamcase::{CaseRecipe, FoamFile};

#[derive(Parser)]
#[command(name = "foamcase")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Prepare OpenFOAM case folders from solver recipes", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the case described by a TOML file
    Prepare {
        #[arg(short, long, default_value = "config.toml")]
        config: String,
        /// Rewrite field and auxiliary files that already exist
        #[arg(long)]
        overwrite: bool,
        /// Delete zero-folder files the recipe does not use
        #[arg(long)]
        remove: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a dictionary file and print it back
    Show {
        path: PathBuf,
        /// Dump the parsed values as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the preset recipes
    Recipes,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Prepare {
            config,
            overwrite,
            remove,
            json,
        } => prepare(&config, overwrite, remove, json),
        Commands::Show { path, json } => show(&path, json),
        Commands::Recipes => {
            list_recipes();
            Ok(())
        }
    }
}

fn prepare(config_path: &str, overwrite: bool, remove: bool, json: bool) -> anyhow::Result<()> {
    let config = load_config_from_file(config_path)
        .with_context(|| format!("loading case description {}", config_path))?;
    let recipe = config.build_recipe()?;
    let mut case = config
        .build_case()
        .with_context(|| format!("setting up case {}", config.case_name))?;

    let mut options = config.prepare_options();
    options.overwrite |= overwrite;
    options.remove |= remove;

    let report = recipe
        .prepare_case(&mut case, options)
        .with_context(|| format!("preparing {} with {}", case, recipe.recipe()))?;
    info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        removed = report.removed.len(),
        "case ready"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (label, paths) in [
            ("written", &report.written),
            ("skipped", &report.skipped),
            ("removed", &report.removed),
        ] {
            for path in paths {
                println!("{:8} {}", label, path.display());
            }
        }
    }
    Ok(())
}

fn show(path: &Path, json: bool) -> anyhow::Result<()> {
    let file = FoamFile::from_file(path).with_context(|| format!("reading {}", path.display()))?;
    if json {
        let dump = json!({
            "name": file.name(),
            "class": file.class(),
            "location": file.location(),
            "values": file.effective_values(),
        });
        println!("{}", serde_json::to_string_pretty(&dump)?);
    } else {
        print!("{}", file);
    }
    Ok(())
}

fn list_recipes() {
    for kind in RecipeKind::ALL {
        let recipe = kind.build(RecipeOverrides::default());
        println!("{}", kind.name());
        println!("  command:         {}", recipe.application().unwrap_or("-"));
        println!("  quantities:      {}", recipe.recipe().quantities().join(" "));
        println!("  residual fields: {}", recipe.residual_fields().join(" "));
    }
}
