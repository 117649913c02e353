use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the web kiosk export stack workspace",
    long_about = "A unified CLI for synthesizing the stack template, packaging\n\
                  the function asset, and running CI checks."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the template into cdk.out/
    Synth {
        /// Deployment stage passed through as STAGE
        #[arg(long, env = "STAGE", default_value = "dev")]
        stage: String,
        /// Synthesize the pipeline-fed variant
        #[arg(long)]
        pipeline: bool,
    },
    /// Package the function source into dist/function.zip
    Package {
        /// Function source directory
        #[arg(long, default_value = "src")]
        source: String,
    },
    /// Run CI checks (fmt, clippy, tests, synth smoke run)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Synthesize every stage variant
    Synth,
    /// Run check + synth
    All,
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn synth_args<'a>(stage: &'a str, output: &'a str, pipeline: bool) -> Vec<&'a str> {
    let mut args = vec![
        "run",
        "-p",
        "kiosk_export_stack_cli",
        "--",
        "--stage",
        stage,
        "synth",
        "--output",
        output,
    ];
    if pipeline {
        args.push("--pipeline");
    }
    args
}

fn template_path(stage: &str, pipeline: bool) -> String {
    let variant = if pipeline { "-pipeline" } else { "" };
    format!("cdk.out/{stage}{variant}.template.json")
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test kiosk_export_stack_core");
    run_cargo(&["test", "-p", "kiosk_export_stack_core"]);

    step("Test kiosk_export_stack_cli");
    run_cargo(&["test", "-p", "kiosk_export_stack_cli"]);
}

fn ci_synth() {
    for (stage, pipeline) in [("dev", false), ("prod", false), ("dev", true)] {
        step(&format!("Synthesize stage={stage} pipeline={pipeline}"));
        let output = template_path(stage, pipeline);
        run_cargo(&synth_args(stage, &output, pipeline));
    }
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth { stage, pipeline } => {
            let output = template_path(&stage, pipeline);
            run_cargo(&synth_args(&stage, &output, pipeline));
            eprintln!("\nTemplate written to {output}");
        }
        Commands::Package { source } => {
            run_cargo(&[
                "run",
                "-p",
                "kiosk_export_stack_cli",
                "--",
                "package",
                "--source",
                &source,
                "--output",
                "dist/function.zip",
            ]);
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Synth => ci_synth(),
                CiJob::All => {
                    ci_check();
                    ci_synth();
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
}
