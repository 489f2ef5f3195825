//! Pre-flight validation of caller arguments.
//!
//! Checks run in a fixed order and stop at the first failure, so the error
//! a caller sees is deterministic for a given input. Nothing here performs
//! I/O.

use std::path::PathBuf;

use crate::error::ClipError;
use crate::types::{ClipPayload, GenomeBuild, Population, Threshold, VariantId};

/// Upper bound on variants per request.
pub const MAX_VARIANTS: usize = 5000;

/// Raw, unvalidated arguments for a SNPclip call.
#[derive(Debug, Clone)]
pub struct SnpClipArgs {
    pub variants: Vec<String>,
    pub populations: Vec<String>,
    pub r2_threshold: f64,
    pub maf_threshold: f64,
    pub token: String,
    /// Where to save the result table, if anywhere.
    pub output: Option<PathBuf>,
    /// Exactly one entry is accepted.
    pub genome_build: Vec<String>,
}

impl Default for SnpClipArgs {
    fn default() -> Self {
        Self {
            variants: Vec::new(),
            populations: vec!["CEU".to_string()],
            r2_threshold: 0.1,
            maf_threshold: 0.01,
            token: String::new(),
            output: None,
            genome_build: vec![GenomeBuild::default().as_str().to_string()],
        }
    }
}

impl SnpClipArgs {
    pub fn new<I, S>(variants: I, token: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variants: variants.into_iter().map(Into::into).collect(),
            token: token.to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<ClipQuery, ClipError> {
        if self.variants.is_empty() || self.variants.len() > MAX_VARIANTS {
            return Err(ClipError::invalid(format!(
                "count out of range: {} variants supplied, expected 1 to {MAX_VARIANTS}",
                self.variants.len()
            )));
        }

        let variants = self
            .variants
            .iter()
            .map(|v| v.parse::<VariantId>())
            .collect::<Result<Vec<_>, _>>()?;

        if self.populations.is_empty() {
            return Err(ClipError::invalid("bad population code: none supplied"));
        }
        let populations = self
            .populations
            .iter()
            .map(|p| p.parse::<Population>())
            .collect::<Result<Vec<_>, _>>()?;

        let r2_threshold = Threshold::new("r2", self.r2_threshold)?;
        let maf_threshold = Threshold::new("maf", self.maf_threshold)?;

        if self.token.trim().is_empty() {
            return Err(ClipError::invalid("missing access token"));
        }

        if let Some(path) = &self.output {
            if path.as_os_str().is_empty() {
                return Err(ClipError::invalid("bad file option"));
            }
        }

        let genome_build = match self.genome_build.as_slice() {
            [one] => one.parse::<GenomeBuild>()?,
            other => {
                return Err(ClipError::invalid(format!(
                    "expected exactly one genome build, got {}",
                    other.len()
                )))
            }
        };

        Ok(ClipQuery {
            variants,
            populations,
            r2_threshold,
            maf_threshold,
            token: self.token.clone(),
            output: self.output.clone(),
            genome_build,
        })
    }
}

/// Arguments that passed validation.
#[derive(Debug, Clone)]
pub struct ClipQuery {
    pub variants: Vec<VariantId>,
    pub populations: Vec<Population>,
    pub r2_threshold: Threshold,
    pub maf_threshold: Threshold,
    pub token: String,
    pub output: Option<PathBuf>,
    pub genome_build: GenomeBuild,
}

impl ClipQuery {
    /// Variants newline-joined, populations `+`-joined, thresholds as text.
    pub fn payload(&self) -> ClipPayload {
        ClipPayload {
            snps: join(&self.variants, "\n"),
            pop: join(&self.populations, "+"),
            r2_threshold: self.r2_threshold.to_string(),
            maf_threshold: self.maf_threshold.to_string(),
            genome_build: self.genome_build.as_str().to_string(),
        }
    }
}

fn join<T: ToString>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}
