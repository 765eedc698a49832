use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use env_logger::Env;
use log::{debug, info};
use structopt::StructOpt;
use trusscalc::{analyse_file, render, render_all, resolve_input, AppConfig, Summary};

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "trusscalc",
    about = "Solves a planar pin-jointed truss described in a text file"
)]
struct Options {
    /// Truss description, or a directory to search for it
    #[structopt(parse(from_os_str))]
    input: Option<PathBuf>,

    /// JSON configuration file
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Directory receiving the SVG diagrams
    #[structopt(long, parse(from_os_str))]
    out_dir: Option<PathBuf>,

    /// File name searched for when INPUT is a directory
    #[structopt(long)]
    name: Option<String>,

    /// Skip writing diagrams
    #[structopt(long)]
    no_plots: bool,

    /// Print a JSON summary instead of the plain result lines
    #[structopt(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let options = Options::from_args();

    // Layer the command line over the configuration file.
    let mut config = match &options.config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };
    if let Some(out_dir) = options.out_dir {
        config.output_dir = out_dir;
    }
    if let Some(name) = options.name {
        config.spec_file_name = name;
    }
    if options.no_plots {
        config.write_plots = false;
    }
    debug!("configuration: {config:?}");

    let cwd = env::current_dir().context("cannot determine the working directory")?;
    let input = resolve_input(options.input.as_deref(), &config.spec_file_name, &cwd)
        .ok_or_else(|| anyhow!("could not find {}", config.spec_file_name))?;
    info!("reading {}", input.display());

    let model = analyse_file(&input, &config)
        .with_context(|| format!("failed to analyse {}", input.display()))?;

    if config.write_plots {
        render_all(&model, &config.output_dir, &config.plot).with_context(|| {
            format!("failed to write diagrams to {}", config.output_dir.display())
        })?;
    }

    if options.json {
        println!("{}", Summary::from_model(&model)?.to_json()?);
    } else {
        print!("{}", render(&model)?);
    }

    Ok(())
}
