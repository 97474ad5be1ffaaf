use anyhow::Context;
use clap::{Parser, Subcommand};
use oc_aggregate::aggregate::{self, Options, Registry, config::LOAD_SPEC};
use oc_aggregate::{SpecNode, diagnostics};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "oc-aggregate")]
#[command(about = "Hierarchical load-spec aggregation", long_about = None)]
struct Cli {
    /// Log filter, e.g. `debug` or `oc_aggregate=trace` (default: $RUST_LOG, then info).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate with the built-in callbacks and write the results as JSON.
    Run {
        #[arg(long)]
        config: String,

        /// Output file; stdout when omitted.
        #[arg(short = 'o', long)]
        out: Option<String>,
    },

    /// Print the resolved leaf selectors of the config's load spec without loading anything.
    Resolve {
        #[arg(long)]
        config: String,
    },
}

fn read_config(path: &str) -> Result<Options> {
    let text = std::fs::read_to_string(path)
        .with_context(|| diagnostics::error_message(format!("reading {}", path)))?;
    let options: Options = serde_json::from_str(&text)
        .with_context(|| diagnostics::error_message(format!("parsing {}", path)))?;
    Ok(options)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    diagnostics::init_logging(cli.log_level.as_deref())?;

    match cli.cmd {
        Commands::Run { config, out } => {
            // 1) Parse run config.
            let options = read_config(&config)?;

            // 2) Aggregate.
            let registry = Registry::standard();
            let results = aggregate::aggregate(options, &registry)?;

            // 3) Write results.
            let json = serde_json::to_string_pretty(&results)?;
            match out {
                Some(out) => {
                    std::fs::write(&out, json)?;
                    eprintln!("Wrote {} results to {}", results.len(), out);
                }
                None => println!("{}", json),
            }
        }
        Commands::Resolve { config } => {
            let mut options = read_config(&config)?;
            let Some(load_spec) = options.shift_remove(LOAD_SPEC) else {
                anyhow::bail!(diagnostics::error_message(format!(
                    "{} has no '{}'",
                    config, LOAD_SPEC
                )));
            };
            let spec = SpecNode::from_value(load_spec)?;
            let resolution = aggregate::resolve(&spec);
            println!("{}", serde_json::to_string_pretty(&resolution.combined)?);
        }
    }

    Ok(())
}
