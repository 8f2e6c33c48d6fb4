//! SDK Stubs Builder CLI
//!
//! Command-line interface for generating typed Python stub packages from
//! cloud SDK service metadata.

mod selection;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use sdk_stubs_builder_common::{
    BuilderConfig, ProductLibrary, RegistryFailurePolicy, ServiceName, ServiceNameCatalog,
};
use sdk_stubs_builder_generator::{
    GenerationReport, GeneratorOptions, PublishedVersions, StubsGenerator,
};
use sdk_stubs_builder_parser::{register_services, DirectoryMetadataStore};
use selection::{get_selected_service_names, updated_services};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sdk-stubs-builder")]
#[command(version, about = "Generate typed stub packages from cloud SDK metadata", long_about = None)]
#[command(after_help = "EXAMPLES:\n  \
    # Generate boto3 stubs and every service package\n  \
    sdk-stubs-builder -o ./mypy_boto3_output -d ./botocore/data --sdk-version 1.34.0\n\n  \
    # Only the services changed in this release\n  \
    sdk-stubs-builder -o ./out -d ./botocore/data --sdk-version 1.34.1 \\\n    \
    -s updated --changelog ./CHANGELOG.rst\n\n  \
    # List services provided by the metadata\n  \
    sdk-stubs-builder -d ./botocore/data --list-services")]
struct Cli {
    /// Output directory
    #[arg(short, long, default_value = "./output")]
    output_path: PathBuf,

    /// Services to generate: `all`, `updated` or service names
    #[arg(short, long, value_delimiter = ',', default_value = "all")]
    services: Vec<String>,

    /// Products to generate
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "boto3,boto3-services"
    )]
    product: Vec<Product>,

    /// botocore data directory with service metadata
    #[arg(short, long)]
    data_path: PathBuf,

    /// SDK version the metadata belongs to
    #[arg(long)]
    sdk_version: Option<String>,

    /// aiobotocore version for aiobotocore products
    #[arg(long)]
    aiobotocore_version: Option<String>,

    /// Package build version (defaults to the library version)
    #[arg(short, long)]
    build_version: Option<String>,

    /// Builder configuration YAML
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON snapshot of published package versions
    #[arg(long)]
    published_versions: Option<PathBuf>,

    /// boto3 CHANGELOG.rst used by the `updated` selector
    #[arg(long)]
    changelog: Option<PathBuf>,

    /// Skip packages whose version is already published
    #[arg(long)]
    skip_published: bool,

    /// Reuse published versions instead of bumping to a post-release
    #[arg(long)]
    disable_smart_version: bool,

    /// Generate for in-place installation without setup files
    #[arg(long)]
    installed: bool,

    /// Only selected services get `Session.client` overloads
    #[arg(long)]
    partial_overload: bool,

    /// List available services and exit
    #[arg(long)]
    list_services: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Product {
    /// boto3-stubs, boto3-stubs-lite and botocore-stubs
    Boto3,
    /// mypy-boto3-<service> packages
    Boto3Services,
    /// types-aiobotocore and types-aiobotocore-lite
    Aiobotocore,
    /// types-aiobotocore-<service> packages
    AiobotocoreServices,
}

impl Product {
    fn library(self) -> ProductLibrary {
        match self {
            Product::Boto3 | Product::Boto3Services => ProductLibrary::Boto3,
            Product::Aiobotocore | Product::AiobotocoreServices => ProductLibrary::AioBotocore,
        }
    }

    fn is_services(self) -> bool {
        matches!(self, Product::Boto3Services | Product::AiobotocoreServices)
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Product::Boto3 => write!(f, "boto3"),
            Product::Boto3Services => write!(f, "boto3-services"),
            Product::Aiobotocore => write!(f, "aiobotocore"),
            Product::AiobotocoreServices => write!(f, "aiobotocore-services"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let store = DirectoryMetadataStore::new(&cli.data_path)
        .with_context(|| format!("Failed to open metadata at {}", cli.data_path.display()))?;
    let catalog =
        ServiceNameCatalog::new(cli.sdk_version.as_deref().unwrap_or(ServiceName::LATEST));
    register_services(&store, &catalog).context("Failed to read available services")?;
    let available = catalog.all();

    if cli.list_services {
        list_services(&available);
        return Ok(());
    }

    let Some(sdk_version) = cli.sdk_version.clone() else {
        bail!("--sdk-version is required to generate packages");
    };

    let config = match &cli.config {
        Some(path) => BuilderConfig::load(path).context("Failed to load builder config")?,
        None => BuilderConfig::with_builtin_rules(),
    };

    let registry = match &cli.published_versions {
        Some(path) => match PublishedVersions::load(path) {
            Ok(registry) => registry,
            Err(err) if config.version_registry.on_unavailable == RegistryFailurePolicy::Abort => {
                return Err(err).context("Published versions unavailable");
            }
            Err(err) => {
                warn!(error = %err, "Published versions unavailable, assuming nothing is published");
                PublishedVersions::empty()
            }
        },
        None => PublishedVersions::empty(),
    };

    let updated = match &cli.changelog {
        Some(path) => {
            let changelog = fs::read_to_string(path)
                .with_context(|| format!("Failed to read changelog {}", path.display()))?;
            updated_services(&changelog, &sdk_version)
        }
        None => Vec::new(),
    };
    let selected = get_selected_service_names(&cli.services, &available, &updated);

    println!(
        "{} Selected {} of {} services",
        "→".cyan(),
        selected.len().to_string().yellow(),
        available.len()
    );

    let mut report = GenerationReport::default();
    for product in &cli.product {
        let library = product.library();
        let library_version = match library {
            ProductLibrary::Boto3 => sdk_version.clone(),
            ProductLibrary::AioBotocore => match &cli.aiobotocore_version {
                Some(version) => version.clone(),
                None => bail!("--aiobotocore-version is required for {}", product),
            },
        };

        let options = GeneratorOptions {
            output_path: cli.output_path.clone(),
            generate_setup: !cli.installed,
            installed: cli.installed,
            build_version: cli
                .build_version
                .clone()
                .unwrap_or_else(|| library_version.clone()),
            library_version,
            partial_overload: cli.partial_overload,
            skip_published: cli.skip_published,
            disable_smart_version: cli.disable_smart_version,
        };

        println!("{} Generating {} product", "→".cyan(), product.to_string().yellow());
        let generator = StubsGenerator::new(
            library,
            options,
            &store,
            &config,
            &registry,
            selected.clone(),
            available.clone(),
        )
        .with_context(|| format!("Failed to create {} generator", product))?;

        let product_report = if product.is_services() {
            generator.generate_service_stubs()
        } else {
            generator.generate_stubs()
        };
        info!(
            product = %product,
            generated = product_report.generated.len(),
            skipped = product_report.skipped.len(),
            failed = product_report.failures.len(),
            "Product finished"
        );
        report.merge(product_report);
    }

    print_report(&report, &cli.output_path);

    if report.is_total_failure() {
        bail!("No packages could be generated");
    }

    Ok(())
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn list_services(available: &[ServiceName]) {
    println!("\n{}", "Available services:".bold());
    for service_name in available {
        println!(
            "  • {} ({})",
            service_name.name().cyan(),
            service_name.client_name()
        );
    }
    println!("\n{} services", available.len());
}

fn print_report(report: &GenerationReport, output_path: &Path) {
    if !report.generated.is_empty() {
        println!("\n{}", "✓ Generation complete!".green().bold());
        println!("\n{}", "Generated packages:".bold());
        for package in &report.generated {
            println!("  📦 {}", package);
        }
        println!("\nOutput: {}", output_path.display());
    }

    if !report.skipped.is_empty() {
        println!("\n{}", "Skipped (already published):".bold());
        for package in &report.skipped {
            println!("  {} {}", "-".dimmed(), package.dimmed());
        }
    }

    if !report.failures.is_empty() {
        println!("\n{}", "✗ Failed packages:".red().bold());
        for failure in &report.failures {
            println!(
                "  • {} [{}]: {}",
                failure.name.red(),
                failure.kind.yellow(),
                failure.message
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_products_and_services() {
        let cli = Cli::try_parse_from([
            "sdk-stubs-builder",
            "-d",
            "./data",
            "-p",
            "boto3-services,aiobotocore",
            "-s",
            "s3,ec2",
            "--skip-published",
        ])
        .unwrap();

        assert_eq!(cli.product, vec![Product::Boto3Services, Product::Aiobotocore]);
        assert_eq!(cli.services, vec!["s3", "ec2"]);
        assert!(cli.skip_published);
        assert_eq!(cli.output_path, PathBuf::from("./output"));
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["sdk-stubs-builder", "-d", "./data"]).unwrap();
        assert_eq!(cli.services, vec!["all"]);
        assert_eq!(cli.product, vec![Product::Boto3, Product::Boto3Services]);
        assert!(Product::Boto3Services.is_services());
        assert_eq!(Product::Aiobotocore.library(), ProductLibrary::AioBotocore);
    }
}
