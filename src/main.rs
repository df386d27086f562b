use anyhow::Context as _;
use clap::{Parser, Subcommand};
use impact_engine::diagnostics::init_logging;
use impact_engine::{Context, Manifest, ParameterRegistry, aggregate, compute, registry_from_manifest};
use std::sync::Arc;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "impact-engine")]
#[command(about = "Compute and aggregate manifest trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every pipeline in a manifest, then aggregate it.
    Run {
        /// Manifest document (JSON).
        #[arg(short = 'm', long)]
        manifest: String,

        /// Where to write the computed manifest. Defaults to stdout.
        #[arg(short = 'o', long)]
        output: Option<String>,

        /// Log every node and plugin step.
        #[arg(long)]
        debug: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run {
            manifest,
            output,
            debug,
        } => {
            init_logging(debug);

            // 1) Parse the manifest.
            let text = std::fs::read_to_string(&manifest)
                .with_context(|| format!("Failed to read manifest {}", manifest))?;
            let mut document: Manifest = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse manifest {}", manifest))?;

            // 2) Parameter metadata: built-ins plus manifest-declared ones.
            let mut params = ParameterRegistry::with_builtins();
            let added = params.combine(document.parameters.iter().cloned());
            tracing::debug!("Loaded {} manifest parameters", added);
            let params = Arc::new(params);

            // 3) Plugins.
            let plugins = registry_from_manifest(&document.initialize, &params)?;
            tracing::info!("Initialized {} plugins", plugins.len());

            // 4) Compute, then aggregate.
            let mut tree = compute(&document.tree, &plugins, &Context::default())?;
            if let Some(spec) = &document.aggregation {
                tree = aggregate(&tree, spec, &params)?;
            }
            document.tree = tree;

            // 5) Emit.
            let rendered = serde_json::to_string_pretty(&document)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {}", path))?;
                    tracing::info!("Wrote {}", path);
                }
                None => println!("{}", rendered),
            }
        }
    }

    Ok(())
}
