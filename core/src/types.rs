//! Domain types for SNPclip requests.
//!
//! # Design
//! Each type is only constructible through validation, so a `ClipQuery`
//! built from them is always sendable. Thresholds stay numeric until the
//! payload is serialized.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::ClipError;

static VARIANT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(rs[0-9]+|chr([0-9]{1,2}|x|y):[0-9]{1,9})$").unwrap());

/// An rsID (`rs123`) or chromosome coordinate (`chr7:24966446`).
///
/// Matching is case-insensitive; the caller's spelling is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantId(String);

impl VariantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for VariantId {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if VARIANT_PATTERN.is_match(s) {
            Ok(VariantId(s.to_string()))
        } else {
            Err(ClipError::invalid(format!("bad variant format: {s}")))
        }
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! populations {
    ($($code:ident),+ $(,)?) => {
        /// 1000 Genomes Project population and super-population codes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(clippy::upper_case_acronyms)]
        pub enum Population {
            $($code),+
        }

        impl Population {
            pub const ALL_CODES: &'static [Population] = &[$(Population::$code),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Population::$code => stringify!($code)),+
                }
            }
        }
    };
}

populations!(
    ALL, AFR, YRI, LWK, GWD, MSL, ESN, ASW, ACB, AMR, MXL, PUR, CLM, PEL, EAS, CHB, JPT, CHS, CDX,
    KHV, EUR, CEU, TSI, FIN, GBR, IBS, SAS, GIH, PJL, BEB, STU, ITU,
);

impl FromStr for Population {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Population::ALL_CODES
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ClipError::invalid(format!("bad population code: {s}")))
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference genome build used to interpret coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenomeBuild {
    #[default]
    Grch37,
    Grch38,
    Grch38HighCoverage,
}

impl GenomeBuild {
    pub const ALL_BUILDS: [GenomeBuild; 3] = [
        GenomeBuild::Grch37,
        GenomeBuild::Grch38,
        GenomeBuild::Grch38HighCoverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenomeBuild::Grch37 => "grch37",
            GenomeBuild::Grch38 => "grch38",
            GenomeBuild::Grch38HighCoverage => "grch38_high_coverage",
        }
    }
}

impl FromStr for GenomeBuild {
    type Err = ClipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GenomeBuild::ALL_BUILDS
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ClipError::invalid(format!(
                    "bad genome build: {s} (expected one of grch37, grch38, grch38_high_coverage)"
                ))
            })
    }
}

impl fmt::Display for GenomeBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    /// `name` prefixes the error message, e.g. `"r2"` or `"maf"`.
    pub fn new(name: &str, value: f64) -> Result<Self, ClipError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Threshold(value))
        } else {
            Err(ClipError::invalid(format!(
                "{name} threshold out of range: {value}"
            )))
        }
    }

}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// JSON body posted to the SNPclip endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipPayload {
    pub snps: String,
    pub pop: String,
    pub r2_threshold: String,
    pub maf_threshold: String,
    pub genome_build: String,
}
