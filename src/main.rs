// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use prefab::{hash, load_descriptor, pipeline, Pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "prefab")]
#[command(author, version, about = "Declarative package build pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a descriptor into an output directory
    Build {
        /// Path to the TOML descriptor
        descriptor: PathBuf,
        /// Output directory for the staged result
        #[arg(short, long)]
        output: PathBuf,
        /// Fetch cache directory (default: /var/cache/prefab/sources)
        #[arg(long, default_value = "/var/cache/prefab/sources")]
        cache_dir: PathBuf,
        /// Keep the working tree after the build, for debugging
        #[arg(long)]
        keep_workdir: bool,
        /// Override the detected host platform for metadata test gating
        #[arg(long)]
        platform: Option<String>,
    },
    /// Parse a descriptor and print what it declares
    Show {
        /// Path to the TOML descriptor
        descriptor: PathBuf,
    },
    /// Hash a file the way the pipeline would
    Hash {
        /// File to hash
        file: PathBuf,
        /// Hash algorithm (sha256 or xxh128)
        #[arg(short, long, default_value = "sha256")]
        algorithm: hash::HashAlgorithm,
    },
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            descriptor,
            output,
            cache_dir,
            keep_workdir,
            platform,
        } => {
            let descriptor = load_descriptor(&descriptor)?;
            info!(
                "Loaded descriptor for {} {}",
                descriptor.package.name, descriptor.package.version
            );

            let pipeline = Pipeline::new(PipelineConfig {
                cache_dir,
                keep_workdir,
                show_progress: true,
                host_platform: platform,
            });
            let report = pipeline.run(&descriptor, &output)?;

            println!("Built {} -> {}", report.metadata.name, output.display());
            println!(
                "Metadata: {}",
                pipeline::metadata_path(&output).display()
            );
            Ok(())
        }
        Commands::Show { descriptor } => {
            let descriptor = load_descriptor(&descriptor)?;

            println!(
                "{} {}",
                descriptor.package.name, descriptor.package.version
            );
            println!("  source:  {}", describe_source(&descriptor));
            for extra in &descriptor.source.extra {
                println!("  extra:   -> {}", extra.unpack_to);
            }
            println!("  patches: {}", descriptor.patch.len());
            if let Some(build) = &descriptor.build {
                println!("  build:   {}", descriptor.substitute(&build.command));
            }
            for entry in &descriptor.stage {
                if entry.source() == entry.dest() {
                    println!("  stage:   {}", entry.source());
                } else {
                    println!("  stage:   {} -> {}", entry.source(), entry.dest());
                }
            }
            for test in &descriptor.metadata.tests {
                if test.platforms.is_empty() {
                    println!("  test:    {}", test.name);
                } else {
                    println!("  test:    {} ({})", test.name, test.platforms.join(", "));
                }
            }
            Ok(())
        }
        Commands::Hash { file, algorithm } => {
            let digest = hash::hash_file(algorithm, &file)?;
            println!("{digest}");
            Ok(())
        }
    }
}

fn describe_source(descriptor: &prefab::Descriptor) -> String {
    use prefab::SourceLocator;

    match &descriptor.source.locator {
        SourceLocator::Url { url } => descriptor.substitute(url),
        SourceLocator::Github { github } => {
            format!("github:{}/{}@{}", github.owner, github.repo, github.tag)
        }
        SourceLocator::Path { path } => path.display().to_string(),
    }
}
