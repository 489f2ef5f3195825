//! In-process stand-in for the LDlink SNPclip endpoint.
//!
//! Pruning is deterministic rather than statistical: a variant is removed
//! when a kept variant sits on the same chromosome within `LD_WINDOW` bp.
//! rs numbers at or above `UNKNOWN_RS_FLOOR` are treated as absent from
//! dbSNP.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;

pub const ENDPOINT: &str = "/LDlinkRest/snpclip";
pub const LD_WINDOW: u64 = 10_000;
pub const UNKNOWN_RS_FLOOR: u64 = 900_000_000;

#[derive(Debug, Clone)]
pub struct MockConfig {
    /// The only token the clip route accepts.
    pub token: String,
    /// When false the probe route answers 503.
    pub available: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            token: "test-token".to_string(),
            available: true,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClipRequest {
    pub snps: String,
    pub pop: String,
    pub r2_threshold: String,
    pub maf_threshold: String,
    #[serde(default = "default_build")]
    pub genome_build: String,
}

fn default_build() -> String {
    "grch37".to_string()
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

type Shared = Arc<MockConfig>;

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    Router::new()
        .route(ENDPOINT, get(probe).post(clip))
        .with_state(Arc::new(config))
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

// axum answers HEAD through the GET handler.
async fn probe(State(config): State<Shared>) -> StatusCode {
    if config.available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn clip(
    State(config): State<Shared>,
    Query(query): Query<TokenQuery>,
    Json(input): Json<ClipRequest>,
) -> (StatusCode, String) {
    if query.token.as_deref() != Some(config.token.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            "Invalid or expired API token.".to_string(),
        );
    }
    (StatusCode::OK, render_clip(&input))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Locus {
    Found { chrom: String, pos: u64 },
    Missing,
}

fn locate(variant: &str) -> Locus {
    let lower = variant.to_ascii_lowercase();
    if let Some(num) = lower.strip_prefix("rs") {
        return match num.parse::<u64>() {
            Ok(n) if n < UNKNOWN_RS_FLOOR => Locus::Found {
                chrom: format!("{}", n % 22 + 1),
                pos: n,
            },
            _ => Locus::Missing,
        };
    }
    if let Some(coord) = lower.strip_prefix("chr") {
        if let Some((chrom, pos)) = coord.split_once(':') {
            if let Ok(pos) = pos.parse::<u64>() {
                return Locus::Found {
                    chrom: chrom.to_ascii_uppercase(),
                    pos,
                };
            }
        }
    }
    Locus::Missing
}

fn alleles(pos: u64) -> &'static str {
    ["(A/G)", "(C/T)", "(G/T)", "(A/C)"][(pos % 4) as usize]
}

/// Produce the tab-delimited body for a clip request.
pub fn render_clip(input: &ClipRequest) -> String {
    let build_label = match input.genome_build.as_str() {
        "grch38" | "grch38_high_coverage" => "GRCh38",
        "grch37" => "GRCh37",
        other => return format!("Error: unknown genome build {other}.\n"),
    };
    let prune = input.r2_threshold.parse::<f64>().map(|r2| r2 < 1.0).unwrap_or(true);

    let mut out = format!("RS Number\tPosition ({build_label})\tAlleles\tDetails\n");
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let mut kept: Vec<(String, String, u64)> = Vec::new();
    let mut found = 0usize;

    for variant in input.snps.lines().map(str::trim).filter(|v| !v.is_empty()) {
        if !seen.insert(variant.to_ascii_lowercase()) {
            duplicates.push(variant.to_string());
            continue;
        }
        let (chrom, pos) = match locate(variant) {
            Locus::Found { chrom, pos } => (chrom, pos),
            Locus::Missing => {
                out.push_str(&format!(
                    "{variant}\tNA\tNA\tVariant not found in dbSNP155 ({build_label}), variant removed.\n"
                ));
                continue;
            }
        };
        found += 1;
        let position = format!("chr{chrom}:{pos}");
        let partner = kept
            .iter()
            .find(|(_, c, p)| prune && *c == chrom && p.abs_diff(pos) < LD_WINDOW)
            .map(|(name, _, _)| name.clone());
        let details = match partner {
            Some(name) => format!("Variant in LD with {name} (R2=1.0), variant removed."),
            None => {
                kept.push((variant.to_string(), chrom.clone(), pos));
                "Variant kept.".to_string()
            }
        };
        out.push_str(&format!("{variant}\t{position}\t{}\t{details}\n", alleles(pos)));
    }

    if found == 0 {
        out.push_str(
            "Error: Input variant list does not contain any valid RS numbers or coordinates.\t\t\t\n",
        );
    } else if !duplicates.is_empty() {
        out.push_str(&format!(
            "Warning: duplicate variants were removed: {}.\t\t\t\n",
            duplicates.join(", ")
        ));
    }
    out
}
