//! Synchronous client for the LDlink SNPclip linkage-disequilibrium pruning
//! service.
//!
//! # Overview
//! Validates caller-supplied variants, populations, thresholds and genome
//! build, posts them to the remote service and parses the tab-delimited
//! reply into a [`ResultTable`]. All pruning happens server-side.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest` / `HttpResponse`);
//!   `build_*` and `parse_*` never touch the network.
//! - The network round-trip goes through the [`Transport`] trait, with a
//!   blocking `ureq` implementation as the default.
//! - Two error tiers: an unreachable service at the liveness probe yields
//!   [`ClipOutcome::Unavailable`], while every later failure is a
//!   [`ClipError`].

pub mod client;
pub mod error;
pub mod http;
pub mod table;
pub mod transport;
pub mod types;
pub mod validate;

pub use client::{snp_clip, ClipOutcome, SnpClipClient, DEFAULT_API_ROOT};
pub use error::{ClipError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use table::ResultTable;
pub use transport::{Transport, UreqTransport};
pub use types::{ClipPayload, GenomeBuild, Population, Threshold, VariantId};
pub use validate::{ClipQuery, SnpClipArgs, MAX_VARIANTS};
