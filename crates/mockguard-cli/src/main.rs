use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use mockguard_core::{auto_interface, Error, InterfaceRegistry, Manifest, Severity};

/// Mockguard — interface contracts for test doubles
///
/// Check contract manifests, sanity-check them against real types, and
/// verify recorded invocations.
#[derive(Parser)]
#[command(name = "mockguard", version, about, long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a manifest and report what it declares
    Check {
        /// Path to manifest .json file
        file: PathBuf,
    },

    /// Check declared interfaces against the real types
    Sanity {
        /// Path to manifest .json file
        file: PathBuf,
    },

    /// Verify recorded invocations against declared interfaces
    Verify {
        /// Path to manifest .json file
        file: PathBuf,
        /// Undeclared interfaces are failures, not advisories
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Do not run sanity checks first
        #[arg(long)]
        skip_sanity: bool,
    },

    /// Compute the registry fingerprint (SHA-256)
    Hash {
        /// Path to manifest .json file
        file: PathBuf,
    },

    /// Print the interface derived from a type's real members
    Derive {
        /// Path to manifest .json file
        file: PathBuf,
        /// Type to derive
        #[arg(long = "type")]
        type_name: String,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Check { file } => cmd_check(&file),
        Commands::Sanity { file } => cmd_sanity(&file),
        Commands::Verify {
            file,
            strict,
            json,
            skip_sanity,
        } => cmd_verify(&file, strict, json, skip_sanity),
        Commands::Hash { file } => cmd_hash(&file),
        Commands::Derive { file, type_name } => cmd_derive(&file, &type_name),
        Commands::Version => {
            println!(
                "mockguard {} (mockguard-core {})",
                env!("CARGO_PKG_VERSION"),
                mockguard_core::VERSION
            );
            0
        }
    };

    process::exit(exit_code);
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,mockguard_cli=debug,mockguard_core=debug")
        } else {
            EnvFilter::new("error")
        }
    });

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ── Commands ──────────────────────────────────────────────

fn cmd_check(file: &Path) -> i32 {
    let manifest = match load(file) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let registry = manifest.session.registry();
    let descriptors: usize = registry.iter().map(|i| i.descriptors().count()).sum();
    println!(
        "{} {}: {} interfaces, {} methods, {} invocations",
        "✓".green(),
        file.display(),
        registry.len(),
        descriptors,
        manifest.invocations.len()
    );
    0
}

fn cmd_sanity(file: &Path) -> i32 {
    let manifest = match load(file) {
        Ok(m) => m,
        Err(code) => return code,
    };
    match manifest.session.run_sanity_checks() {
        Ok(()) => {
            println!(
                "{} {} interfaces match their types",
                "✓".green(),
                manifest.session.registry().len()
            );
            0
        }
        Err(e) => report(&e),
    }
}

fn cmd_verify(file: &Path, strict: bool, json: bool, skip_sanity: bool) -> i32 {
    let mut manifest = match load(file) {
        Ok(m) => m,
        Err(code) => return code,
    };

    let config = match manifest.session.config().clone().with_env_overrides() {
        Ok(c) => c,
        Err(e) => return report(&e),
    };
    manifest
        .session
        .set_require_declared_interfaces(config.require_declared_interfaces || strict);
    debug!(config = ?manifest.session.config(), "effective configuration");

    if !skip_sanity {
        if let Err(e) = manifest.session.run_sanity_checks() {
            return report(&e);
        }
    }

    let result = manifest.session.verifier().verify_all(&manifest.invocations);

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return 2;
            }
        }
    } else {
        for diagnostic in &result.diagnostics {
            match diagnostic.severity {
                Severity::Error => eprintln!("{}", diagnostic.to_string().red()),
                Severity::Warning => eprintln!("{}", diagnostic.to_string().yellow()),
            }
        }
        if result.is_valid() {
            println!(
                "{} {} invocations verified ({} advisories)",
                "✓".green(),
                result.checked,
                result.warnings().len()
            );
        } else {
            println!(
                "{} {} contract violations in {} invocations",
                "✗".red(),
                result.errors().len(),
                result.checked
            );
        }
    }

    if result.is_valid() {
        0
    } else {
        1
    }
}

fn cmd_hash(file: &Path) -> i32 {
    match load(file) {
        Ok(manifest) => {
            println!("{}", manifest.session.registry().fingerprint());
            0
        }
        Err(code) => code,
    }
}

fn cmd_derive(file: &Path, type_name: &str) -> i32 {
    let manifest = match load(file) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let ty = match manifest.types.resolve(type_name) {
        Ok(t) => t,
        Err(e) => return report(&e),
    };
    let mut registry = InterfaceRegistry::new();
    if let Err(e) = auto_interface::define_interface(&mut registry, &ty) {
        return report(&e);
    }
    match registry.get(&ty) {
        Some(interface) => {
            print!("{}", interface.render());
            0
        }
        None => 1,
    }
}

// ── Helpers ───────────────────────────────────────────────

fn load(file: &Path) -> Result<Manifest, i32> {
    let text = std::fs::read_to_string(file).map_err(|e| {
        eprintln!(
            "{} cannot read {}: {}",
            "error:".red().bold(),
            file.display(),
            e
        );
        2
    })?;
    Manifest::from_json_str(&text).map_err(|e| report(&e))
}

/// Print an error and map it to an exit code: 2 for unusable input,
/// 1 for contract failures
fn report(error: &Error) -> i32 {
    for single in error.violations() {
        eprintln!("{} {}", "error:".red().bold(), single);
    }
    match error {
        Error::Manifest(_) | Error::Config(_) => 2,
        _ => 1,
    }
}
