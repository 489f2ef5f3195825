//! Tab-delimited result tables.
//!
//! The service schema is opaque: columns and cells are kept as strings.
//! Column names are sanitized on parse so they are usable as identifiers.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ClipError;

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.]").unwrap());
static DOT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.+").unwrap());

/// Make a header usable as an identifier: characters outside
/// `[A-Za-z0-9_.]` become `.`, then every run of dots becomes one `_`.
///
/// `"R.Squared"` -> `"R_Squared"`, `"A..B"` -> `"A_B"`,
/// `"Position (GRCh37)"` -> `"Position_GRCh37_"`.
pub fn sanitize_column(name: &str) -> String {
    let dotted = UNSAFE_CHARS.replace_all(name.trim(), ".");
    DOT_RUNS.replace_all(&dotted, "_").into_owned()
}

/// Suffix repeated names with `_1`, `_2`, ... so every column is
/// addressable. `["A_B", "A_B"]` -> `["A_B", "A_B_1"]`.
fn unique_columns(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 1;
        while taken.contains(&candidate) {
            candidate = format!("{name}_{n}");
            n += 1;
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

/// True when a cell carries an error or warning, in any letter case.
pub fn is_flagged(cell: &str) -> bool {
    let lower = cell.to_lowercase();
    lower.contains("error") || lower.contains("warning")
}

/// A parsed service response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Parse tab-delimited text with a header row.
    pub fn parse_tsv(text: &str) -> Result<Self, ClipError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns = unique_columns(reader.headers()?.iter().map(sanitize_column).collect());
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of the named (sanitized) column. Short rows yield `""`.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// The error or warning the service placed in the last row's first
    /// cell, if any.
    pub fn in_band_message(&self) -> Option<&str> {
        let cell = self.rows.last()?.first()?;
        is_flagged(cell).then_some(cell.as_str())
    }

    /// Write as tab-delimited text: header row, no quoting, no row index.
    pub fn write_tsv(&self, path: &Path) -> Result<(), ClipError> {
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(QuoteStyle::Never)
            .flexible(true)
            .from_writer(File::create(path)?);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ResultTable {
    /// Print the table text to `out`. A closed pipe on the reader's side is
    /// not an error; any other write failure is.
    pub fn print_to<W: Write>(&self, out: &mut W) -> Result<(), ClipError> {
        match write!(out, "{self}").and_then(|()| out.flush()) {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join("\t"))?;
        for row in &self.rows {
            writeln!(f, "{}", row.join("\t"))?;
        }
        Ok(())
    }
}
