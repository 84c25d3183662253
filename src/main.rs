mod pipelines;
mod utils;
mod config;
mod cli;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use std::{env, fs};

use anyhow::Result;
use env_logger::Builder;
use log::{LevelFilter, error, info};

use crate::cli::parse;
use crate::config::defs::{PipelineError, RunConfig, load_tool_config};
use crate::pipelines::{simulation, teflon};

#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n TeSim\n-------------\n");

    let dir = env::current_dir()?;
    info!("The current directory is {:?}\n", dir);

    let tools = match load_tool_config(Path::new(&args.tool_config)) {
        Ok(tools) => tools,
        Err(e) => {
            error!("Cannot load tool config: {}", e);
            std::process::exit(1);
        }
    };

    let out_dir = match setup_output_dir(&args, &dir) {
        Ok(out_dir) => out_dir,
        Err(e) => {
            error!("Cannot create output directory: {}", e);
            std::process::exit(1);
        }
    };

    let module = args.module.clone();
    let run_config = Arc::new(RunConfig {
        cwd: dir,
        out_dir,
        args,
        tools,
    });

    if let Err(e) = match module.as_str() {
        "simulation" => simulation::run(run_config).await,
        "teflon" => teflon::run(run_config).await,
        _ => Err(PipelineError::InvalidConfig(format!(
            "Invalid module: {}",
            module
        ))),
    } {
        error!(
            "Pipeline failed: {} at {} milliseconds.",
            e,
            run_start.elapsed().as_millis()
        );
        std::process::exit(1);
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}

/// Sets up the output directory.
/// If `out` is specified from args, uses it; otherwise runs in the current
/// working directory. Ensures the directory exists.
///
/// # Arguments
/// * `args` - The parsed command-line arguments.
/// * `cwd` - The current working directory.
/// # Returns
/// path to the output directory.
fn setup_output_dir(args: &cli::Arguments, cwd: &PathBuf) -> Result<PathBuf> {
    let out_dir = match &args.out_dir {
        Some(out) => {
            let path = PathBuf::from(out);
            if path.is_absolute() { path } else { cwd.join(path) }
        }
        None => cwd.clone(),
    };
    fs::create_dir_all(&out_dir)?;
    Ok(out_dir)
}
