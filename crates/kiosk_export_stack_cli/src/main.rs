use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use kiosk_export_stack_core::asset::package_asset;
use kiosk_export_stack_core::config::{CodeSource, StackConfig};
use kiosk_export_stack_core::naming::ResourceNames;
use kiosk_export_stack_core::stage::{app_stack_id, Stage};
use kiosk_export_stack_core::synthesize;

const DEFAULT_BASE_NAME: &str = "marble-web-kiosk-export";
const DEFAULT_ASSET_OUTPUT: &str = "dist/function.zip";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "kiosk-export-stack",
    about = "Synthesize the scheduled web kiosk export stack",
    long_about = "Builds the CloudFormation template for the web kiosk export job\n\
                  (execution role, policy, scheduled function and daily rule)\n\
                  and packages the function source as a deployable asset."
)]
struct Cli {
    /// Deployment stage; only `prod` selects production settings
    #[arg(long, env = "STAGE", global = true)]
    stage: Option<String>,
    /// TOML stack configuration layered under command-line flags
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct IdArgs {
    /// Logical identifier; defaults to the base name plus a stage suffix
    #[arg(long)]
    id: Option<String>,
    /// Application base name used when --id is not given
    #[arg(long, default_value = DEFAULT_BASE_NAME)]
    base_name: String,
}

impl IdArgs {
    fn resolve(&self, stage: &Stage) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| app_stack_id(&self.base_name, stage))
    }
}

#[derive(clap::Args)]
struct SynthArgs {
    #[command(flatten)]
    id: IdArgs,
    /// Output file (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Expect function code from pipeline-supplied parameters
    #[arg(long)]
    pipeline: bool,
    /// Attach the sentry and google API layers
    #[arg(long)]
    with_layers: bool,
    /// Package this source directory first and record its path and hash
    #[arg(long, conflicts_with_all = ["pipeline", "asset_hash"])]
    package_source: Option<PathBuf>,
    /// Archive written when --package-source is given
    #[arg(long, default_value = DEFAULT_ASSET_OUTPUT)]
    asset_output: PathBuf,
    /// Asset hash to record on the function
    #[arg(long, conflicts_with = "pipeline")]
    asset_hash: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the synthesized template to stdout or a file
    Synth(SynthArgs),
    /// Package the function source directory into a zip asset
    Package {
        /// Function source directory
        #[arg(long, default_value = "src")]
        source: PathBuf,
        /// Archive path
        #[arg(long, default_value = DEFAULT_ASSET_OUTPUT)]
        output: PathBuf,
    },
    /// Print the physical resource names for a stack
    Names {
        #[command(flatten)]
        id: IdArgs,
    },
}

// ── commands ───────────────────────────────────────────────────────

fn load_config(path: Option<&Path>, stage: Option<&str>) -> Result<StackConfig> {
    let mut config = StackConfig::load(path).context("failed to load stack configuration")?;
    // The command line (or STAGE) wins over the file; neither means the
    // file's stage, which itself defaults to dev.
    if stage.is_some() {
        config.stage = Stage::from_env_value(stage);
    }
    Ok(config)
}

fn run_synth(mut config: StackConfig, args: &SynthArgs) -> Result<()> {
    if args.pipeline {
        config = config.with_pipeline_code();
    }
    if args.with_layers {
        config = config.with_known_layers();
    }

    if let Some(source) = args.package_source.as_deref() {
        let packaged = package_asset(source, &args.asset_output)
            .with_context(|| format!("failed to package {}", source.display()))?;
        config.code_source = CodeSource::Asset {
            path: source.display().to_string(),
            hash: Some(packaged.hash),
        };
    } else if let (Some(hash), CodeSource::Asset { hash: slot, .. }) =
        (args.asset_hash.clone(), &mut config.code_source)
    {
        *slot = Some(hash);
    }

    let stack_id = args.id.resolve(&config.stage);
    let template = synthesize(&stack_id, &config)
        .with_context(|| format!("failed to synthesize stack '{stack_id}'"))?;
    let json = template.to_json_pretty()?;
    info!(
        stack_id = %stack_id,
        stage = %config.stage,
        fingerprint = %template.fingerprint()?,
        "template ready"
    );

    match args.output.as_deref() {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "template written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_package(source: &Path, output: &Path) -> Result<()> {
    let packaged = package_asset(source, output)
        .with_context(|| format!("failed to package {}", source.display()))?;
    println!(
        "{}",
        serde_json::json!({
            "archive": packaged.archive_path.display().to_string(),
            "hash": packaged.hash,
            "files": packaged.file_count,
        })
    );
    Ok(())
}

fn run_names(config: &StackConfig, id: &IdArgs) -> Result<()> {
    let stack_id = id.resolve(&config.stage);
    let names = ResourceNames::for_id(&stack_id)?;
    println!("stack    {}", names.stack);
    println!("role     {}", names.role);
    println!("policy   {}", names.policy);
    println!("function {}", names.function);
    println!("rule     {}", names.rule);
    Ok(())
}

// ── main ───────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.stage.as_deref())?;

    match cli.command {
        Commands::Synth(args) => run_synth(config, &args),
        Commands::Package { source, output } => run_package(&source, &output),
        Commands::Names { id } => run_names(&config, &id),
    }
}
