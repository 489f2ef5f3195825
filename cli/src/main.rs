use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use snpclip_core::{ClipOutcome, SnpClipArgs, SnpClipClient, UreqTransport, DEFAULT_API_ROOT};

/// Exit status when the LDlink service could not be reached.
const EXIT_UNAVAILABLE: u8 = 2;
/// Exit status for bad arguments and failed calls.
const EXIT_FAILURE: u8 = 1;

#[derive(Parser)]
#[command(name = "snpclip")]
#[command(about = "Prune a variant list by linkage disequilibrium with LDlink SNPclip")]
#[command(version)]
struct Cli {
    /// rsIDs (rs123) or coordinates (chr7:24966446)
    variants: Vec<String>,

    /// Read additional variants from a file, one per line
    #[arg(short = 'f', long)]
    variants_file: Option<PathBuf>,

    /// LDlink API access token
    #[arg(long, env = "LDLINK_TOKEN", hide_env_values = true, default_value = "", hide_default_value = true)]
    token: String,

    /// 1000 Genomes population code; repeat for several
    #[arg(short, long = "pop", default_value = "CEU")]
    populations: Vec<String>,

    /// R² pruning threshold in [0, 1]
    #[arg(long, default_value_t = 0.1, allow_negative_numbers = true)]
    r2: f64,

    /// Minor allele frequency threshold in [0, 1]
    #[arg(long, default_value_t = 0.01, allow_negative_numbers = true)]
    maf: f64,

    /// grch37, grch38 or grch38_high_coverage
    #[arg(short, long, default_value = "grch37")]
    genome_build: Vec<String>,

    /// Save the result table to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// LDlink REST API root
    #[arg(long, env = "LDLINK_API_ROOT", default_value = DEFAULT_API_ROOT)]
    api_root: String,

    /// Request timeout in seconds; unset uses the transport default
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
    Ok(())
}

/// One variant per line; blank lines and `#` comments are skipped.
fn read_variants(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read variants file {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut variants = cli.variants;
    if let Some(path) = &cli.variants_file {
        variants.extend(read_variants(path)?);
    }
    debug!(count = variants.len(), "collected variants");

    let args = SnpClipArgs {
        variants,
        populations: cli.populations,
        r2_threshold: cli.r2,
        maf_threshold: cli.maf,
        token: cli.token,
        output: cli.output,
        genome_build: cli.genome_build,
    };

    let transport = UreqTransport::new(cli.timeout_secs.map(Duration::from_secs));
    let client = SnpClipClient::with_transport(&cli.api_root, transport);

    match client.snp_clip(&args)? {
        ClipOutcome::Unavailable => Ok(ExitCode::from(EXIT_UNAVAILABLE)),
        ClipOutcome::Table(table) => {
            // With --output the table was already echoed by the client.
            if args.output.is_none() {
                table.print_to(&mut std::io::stdout())?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `--help` and `--version` succeed; every other parse error is a failure,
/// never the unavailable status.
fn parse_error_status(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        EXIT_FAILURE
    } else {
        0
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_error_status(&e));
        }
    };
    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("Error: {e:#}");
        return ExitCode::from(EXIT_FAILURE);
    }
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
