//! aes-builder command line interface
//!
//! # Usage
//!
//! ```bash
//! # Validate a configuration and show what it describes
//! aes-builder validate --config config.json
//!
//! # Same, as JSON for tooling
//! aes-builder validate --config config.json --format json
//!
//! # Generate all source artifacts into the project tree
//! aes-builder generate --config config.json --project-dir .
//!
//! # Generate, run the Gradle build and collect the built libraries
//! aes-builder build --config config.json --project-dir .
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use aes_builder::outputs::collect_outputs;
use aes_builder::{generate_project, gradle, BuildConfig, TemplateSet, WritePolicy};

#[derive(Parser)]
#[command(name = "aes-builder")]
#[command(version = "0.1.0")]
#[command(about = "Generate an AES key-embedding Android native library project")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: json or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a configuration file
    Validate {
        /// Path to config.json
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },

    /// Validate, render and write every source artifact
    Generate {
        /// Path to config.json
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Project root the artifacts are written into
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Directory holding the template files
        #[arg(long, default_value = "templates")]
        templates: PathBuf,

        /// Stage the whole artifact set and move it into place only after
        /// every file rendered successfully
        #[arg(long)]
        staged: bool,
    },

    /// Generate, run the Gradle build and collect the built libraries
    Build {
        /// Path to config.json
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Project root the artifacts are written into
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Directory holding the template files
        #[arg(long, default_value = "templates")]
        templates: PathBuf,

        /// Stage the whole artifact set and move it into place only after
        /// every file rendered successfully
        #[arg(long)]
        staged: bool,
    },
}

/// Machine-readable form of a validated configuration. The secrets are
/// deliberately absent.
#[derive(Serialize)]
struct ConfigSummary<'a> {
    package_name: &'a str,
    so_name: &'a str,
    jni_class: String,
    methods: Vec<&'a str>,
    abi_filters: &'a [String],
    signing_enabled: bool,
}

impl<'a> ConfigSummary<'a> {
    fn new(config: &'a BuildConfig) -> Self {
        let mut methods = vec![
            config.method_encode.as_str(),
            config.method_decode.as_str(),
            config.method_check.as_str(),
        ];
        if let Some(signing) = &config.signing {
            methods.push(signing.method_sign.as_str());
        }
        Self {
            package_name: &config.package_name,
            so_name: &config.so_name,
            jni_class: format!("{}.{}", config.jni_class_package, config.jni_class_name),
            methods,
            abi_filters: &config.abi_filters,
            signing_enabled: config.signing_enabled(),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let quiet = cli.quiet;
    match cli.command {
        Commands::Validate { config } => {
            let config = load_config(&config)?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&ConfigSummary::new(&config))?);
                }
                OutputFormat::Pretty => {
                    if !quiet {
                        print_summary(&config);
                    }
                    println!("{}", "configuration is valid".green());
                }
            }
            Ok(())
        }
        Commands::Generate {
            config,
            project_dir,
            templates,
            staged,
        } => {
            let config = load_config(&config)?;
            if format == OutputFormat::Pretty && !quiet {
                print_summary(&config);
            }
            let written = generate(&config, &project_dir, &templates, staged, format, quiet)?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&written)?);
            }
            Ok(())
        }
        Commands::Build {
            config,
            project_dir,
            templates,
            staged,
        } => {
            let config = load_config(&config)?;
            if format == OutputFormat::Pretty && !quiet {
                print_summary(&config);
            }
            generate(&config, &project_dir, &templates, staged, format, quiet)?;

            gradle::run_module_build(&project_dir).context("gradle build")?;

            let report = collect_outputs(&project_dir, &config).context("collecting outputs")?;
            for abi in &report.missing_abis {
                println!("{} no library found for {abi}", "warning:".yellow());
            }
            println!(
                "{} {} librar{} copied to output/",
                "done:".green().bold(),
                report.libraries_copied,
                if report.libraries_copied == 1 { "y" } else { "ies" }
            );
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<BuildConfig> {
    BuildConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn generate(
    config: &BuildConfig,
    project_dir: &Path,
    templates_dir: &Path,
    staged: bool,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<Vec<String>> {
    let templates = TemplateSet::load(templates_dir)
        .with_context(|| format!("loading templates from {}", templates_dir.display()))?;

    let policy = if staged {
        WritePolicy::Staged
    } else {
        WritePolicy::Direct
    };
    let plan = generate_project(config, &templates, project_dir, policy)
        .context("generating artifacts")?;

    let mut written = Vec::with_capacity(plan.artifacts.len());
    for artifact in &plan.artifacts {
        if format == OutputFormat::Pretty && !quiet {
            println!("  {} {}", "[ok]".green(), artifact.relative_path.display());
        }
        written.push(artifact.relative_path.display().to_string());
    }
    Ok(written)
}

fn print_summary(config: &BuildConfig) {
    println!("  package:   {}", config.package_name.cyan());
    println!("  library:   {}", config.so_name.cyan());
    println!(
        "  jni class: {}.{}",
        config.jni_class_package,
        config.jni_class_name.cyan()
    );
    println!("  abis:      {}", config.abi_filters.join(", "));
    println!(
        "  signing:   {}",
        if config.signing_enabled() {
            "enabled".green()
        } else {
            "disabled".normal()
        }
    );
}
