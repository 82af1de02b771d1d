//! BIeR Driver
//!
//! Command line entry point for the BIeR IR toolkit. Builds one of the
//! built-in sample modules, optionally runs SSA construction over it and
//! emits the result as text, Graphviz DAGs or JSON.

mod samples;

use bier_ir::dag::{DagDotSerializer, OpDagBuilder};
use bier_ir::serialize::{to_json, TextSerializer};
use bier_ir::{Module, OperationPass, SsaPass};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bier")]
#[command(about = "BIeR typed IR toolkit")]
#[command(version = "0.1.0")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a sample module and print it
    Demo {
        /// Sample to build (see `bier list`)
        sample: String,

        /// Run SSA construction before emitting
        #[arg(long)]
        ssa: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = Emit::Text)]
        emit: Emit,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the built-in samples
    List,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Text,
    Dot,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Demo { sample, ssa, emit, output } => {
            if let Err(e) = run_demo(&sample, ssa, emit, output.as_deref()) {
                eprintln!("Error running demo: {}", e);
                std::process::exit(1);
            }
        }
        Commands::List => {
            for sample in samples::SAMPLES {
                println!("{:<8} {}", sample.name, sample.description);
            }
        }
    }
}

fn run_demo(
    name: &str,
    ssa: bool,
    emit: Emit,
    output_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sample = samples::find(name).ok_or_else(|| format!("Unknown sample: {}", name))?;
    let mut module = sample.build()?;
    info!("built sample {}", sample.name);

    if ssa {
        module = SsaPass::new().apply(module);
        info!("SSA construction done");
    }

    let rendered = match emit {
        Emit::Text => TextSerializer::new(&module).module_to_string(),
        Emit::Dot => render_dags(&module),
        Emit::Json => to_json(&module)?,
    };

    match output_path {
        Some(path) => {
            fs::write(path, &rendered)?;
            println!("Output written to: {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

/// One DAG cluster per block of every defined function
fn render_dags(module: &Module) -> String {
    let builder = OpDagBuilder::new(module);
    let mut dot = DagDotSerializer::new();
    for (_, function) in module.defined_functions() {
        for block in function.blocks() {
            let graph = builder.build(function.id, block.id);
            dot.serialize(&graph, &format!("{}:{}", function.name(), block.label));
        }
    }
    dot.finish()
}
