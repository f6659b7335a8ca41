use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cloudreview::config::{Config, ScanOverrides};
use cloudreview::error::ReviewError;
use cloudreview::output::OutputFormat;
use cloudreview::rules::Impact;
use cloudreview::scanners::ScannerRegistry;
use cloudreview::ScanOptions;

#[derive(Parser)]
#[command(
    name = "cloudreview",
    about = "Best-practice review for cloud resource inventories",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review every resource in an inventory export
    Scan {
        /// Inventory export (JSON)
        #[arg(long, short = 'i', env = "CLOUDREVIEW_INVENTORY")]
        inventory: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (console, json, markdown)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Minimum impact to fail (low, medium, high)
        #[arg(long)]
        fail_on: Option<String>,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Subscription id to scan (repeatable)
        #[arg(long = "subscription", short = 's')]
        subscriptions: Vec<String>,

        /// Resource group to scan (repeatable)
        #[arg(long = "resource-group", short = 'g')]
        resource_groups: Vec<String>,

        /// Resource type glob to include (repeatable)
        #[arg(long = "include")]
        include_types: Vec<String>,

        /// Resource type glob to exclude (repeatable)
        #[arg(long = "exclude")]
        exclude_types: Vec<String>,

        /// Parallel scan tasks
        #[arg(long)]
        concurrency: Option<usize>,

        /// Abort the run after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Also evaluate detailed recommendations
        #[arg(long)]
        detailed: bool,

        /// Include provider advisor recommendations
        #[arg(long)]
        advisor: bool,

        /// Show only the tail of subscription ids
        #[arg(long)]
        mask: bool,
    },

    /// List all recommendations
    ListRules {
        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// List supported resource types
    ListTypes,

    /// Generate a starter .cloudreview.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan {
            inventory,
            config,
            format,
            fail_on,
            output,
            subscriptions,
            resource_groups,
            include_types,
            exclude_types,
            concurrency,
            timeout,
            detailed,
            advisor,
            mask,
        } => {
            let overrides = ScanOverrides {
                subscriptions,
                resource_groups,
                include_types,
                exclude_types,
                concurrency,
                timeout_secs: timeout,
                detailed,
                advisor,
                mask,
            };
            cmd_scan(inventory, config, format, fail_on, output, overrides)
        }
        Commands::ListRules { format } => cmd_list_rules(format),
        Commands::ListTypes => cmd_list_types(),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn cmd_scan(
    inventory: PathBuf,
    config: Option<PathBuf>,
    format_str: String,
    fail_on_str: Option<String>,
    output_path: Option<PathBuf>,
    overrides: ScanOverrides,
) -> Result<i32, ReviewError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });

    let fail_on = fail_on_str.and_then(|s| {
        let impact = Impact::from_str_lenient(&s);
        if impact.is_none() {
            eprintln!("Warning: unknown impact '{}', using config default", s);
        }
        impact
    });

    let options = ScanOptions {
        config_path: config,
        fail_on_override: fail_on,
        overrides,
        ..ScanOptions::default()
    };

    let report = cloudreview::scan_inventory(&inventory, &options)?;
    let rendered = cloudreview::render_report(&report, format)?;

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = pass, 1 = broken recommendations at or above threshold
    Ok(if report.verdict.pass { 0 } else { 1 })
}

fn cmd_list_rules(format_str: String) -> Result<i32, ReviewError> {
    let registry = ScannerRegistry::builtin()?;
    let rules = registry.list_rules();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&rules)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{:<10} {:<8} {:<24} {:<9} DESCRIPTION",
                "ID", "IMPACT", "CATEGORY", "DETAILED"
            );
            println!("{}", "-".repeat(100));
            for rule in &rules {
                println!(
                    "{:<10} {:<8} {:<24} {:<9} {}",
                    rule.id,
                    rule.impact.to_string(),
                    rule.category.to_string(),
                    if rule.detailed { "yes" } else { "" },
                    rule.description,
                );
            }
        }
    }

    Ok(0)
}

fn cmd_list_types() -> Result<i32, ReviewError> {
    let registry = ScannerRegistry::builtin()?;
    for entry in registry.entries() {
        let scope = match entry.scope {
            cloudreview::cloud::ScopeKind::Subscription => "subscription",
            cloudreview::cloud::ScopeKind::ResourceGroup => "resource group",
        };
        println!("{:<48} {}", entry.resource_type, scope);
    }
    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, ReviewError> {
    let path = PathBuf::from(".cloudreview.toml");

    if path.exists() && !force {
        eprintln!(".cloudreview.toml already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created .cloudreview.toml");

    Ok(0)
}
