use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ocds_profile_builder::{
    MirrorSource, ProfileBuilder, ProfileConfig, StandardDirectory, StandardFiles, write_profile,
};
use ocds_profile_core::{Diagnostics, Severity};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Output format for machine-readable subcommands.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "ocds-profile")]
#[command(about = "Build OCDS profiles from the standard and a set of extensions")]
struct Cli {
    /// Log progress at debug level (RUST_LOG overrides).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve the profile and write its schema and codelists.
    Build(BuildArgs),
    /// Print the configured extension versions and their metadata.
    Extensions(PrintArgs),
    /// Print the consolidated release schema patch.
    SchemaPatch(PrintArgs),
    /// Print the patched codelists and the events of resolving them.
    Codelists(CodelistsArgs),
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Path to the profile's YAML configuration.
    #[arg(long)]
    config: PathBuf,
    /// Local mirror of the registry and extension files.
    #[arg(long)]
    mirror: PathBuf,
    /// Override the configured registry base URL.
    #[arg(long)]
    registry_base_url: Option<String>,
}

#[derive(Debug, Args)]
struct BuildArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Directory with one `<version>/schema/` tree per version of the standard.
    #[arg(long)]
    standard: PathBuf,
    /// Output directory for the profile.
    #[arg(long)]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct PrintArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct CodelistsArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Directory with one `<version>/schema/` tree per version of the standard.
    #[arg(long)]
    standard: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Build(args) => run_build(args),
        Command::Extensions(args) => run_extensions(args),
        Command::SchemaPatch(args) => run_schema_patch(args),
        Command::Codelists(args) => run_codelists(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &SourceArgs) -> Result<ProfileConfig, String> {
    let mut config = ProfileConfig::load(&args.config).map_err(|err| {
        format!(
            "Failed to load config '{}': {err}",
            args.config.display()
        )
    })?;
    if let Some(url) = &args.registry_base_url {
        config.registry_base_url = Some(url.clone());
    }
    tracing::debug!(
        standard = config.standard_version.as_str(),
        extensions = config.extensions.len(),
        registry = config.registry_base_url(),
        "loaded config"
    );
    Ok(config)
}

fn profile_builder<F: StandardFiles>(
    args: &SourceArgs,
    standard: F,
) -> Result<ProfileBuilder<MirrorSource, F>, String> {
    if !args.mirror.is_dir() {
        return Err(format!(
            "Mirror directory '{}' does not exist",
            args.mirror.display()
        ));
    }
    let config = load_config(args)?;
    Ok(ProfileBuilder::new(
        config,
        MirrorSource::new(&args.mirror),
        standard,
    ))
}

fn print_formatted<T: Serialize>(value: &T, format: CliOutputFormat) -> Result<(), String> {
    let output = match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| format!("Failed to serialize output: {e}"))?,
        CliOutputFormat::Yaml => serde_yaml::to_string(value)
            .map_err(|e| format!("Failed to serialize output: {e}"))?,
    };
    println!("{}", output.trim_end());
    Ok(())
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        let label = match diagnostic.severity {
            Severity::Info => "info",
        };
        println!("{label}: {}", diagnostic.message);
    }
}

// ---------------------------------------------------------------------------
// build command
// ---------------------------------------------------------------------------

fn run_build(args: BuildArgs) -> Result<(), String> {
    let builder = profile_builder(&args.source, StandardDirectory::new(&args.standard))?;
    let profile = builder.build().map_err(|err| err.to_string())?;

    fs::create_dir_all(&args.output).map_err(|err| {
        format!(
            "Failed to create output directory '{}': {err}",
            args.output.display()
        )
    })?;
    let written = write_profile(&args.output, &profile).map_err(|err| err.to_string())?;

    print_diagnostics(&profile.diagnostics);
    println!(
        "Wrote {} files for {} extensions to {}",
        written.len(),
        profile.extensions.len(),
        args.output.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// extensions / schema-patch commands
// ---------------------------------------------------------------------------

fn run_extensions(args: PrintArgs) -> Result<(), String> {
    let builder = profile_builder(&args.source, BTreeMap::<String, String>::new())?;
    let extensions = builder.extensions().map_err(|err| err.to_string())?;
    print_formatted(&extensions, args.format)
}

fn run_schema_patch(args: PrintArgs) -> Result<(), String> {
    let builder = profile_builder(&args.source, BTreeMap::<String, String>::new())?;
    let patch = builder
        .release_schema_patch()
        .map_err(|err| err.to_string())?;
    print_formatted(&patch, args.format)
}

// ---------------------------------------------------------------------------
// codelists command
// ---------------------------------------------------------------------------

fn run_codelists(args: CodelistsArgs) -> Result<(), String> {
    let builder = profile_builder(&args.source, StandardDirectory::new(&args.standard))?;
    let resolved = builder
        .patched_codelists()
        .map_err(|err| err.to_string())?;

    for (name, table) in &resolved.value {
        println!("{name}\t{}", table.len());
    }
    print_diagnostics(&resolved.diagnostics);
    Ok(())
}
