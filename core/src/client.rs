//! Request builder, response parser and call orchestration for SNPclip.
//!
//! # Design
//! `SnpClipClient` holds the API root and a `Transport`. `build_probe`,
//! `build_clip` and `parse_clip` are pure; `snp_clip` strings them together:
//! validate, probe, post, parse, optionally save.
//!
//! The probe is a soft gate. If the service cannot be reached, or answers
//! the probe with an error status, the call logs a warning and returns
//! `ClipOutcome::Unavailable`. Everything after the probe fails hard.

use std::io::{self, Write};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ClipError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::table::{is_flagged, ResultTable};
use crate::transport::{Transport, UreqTransport};
use crate::validate::{ClipQuery, SnpClipArgs};

pub const DEFAULT_API_ROOT: &str = "https://ldlink.nih.gov/LDlinkRest";

const UNAVAILABLE_MESSAGE: &str =
    "The LDlink server is down or not accessible. Please try again later.";

/// Result of a call that got past validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOutcome {
    Table(ResultTable),
    /// The liveness probe failed; no request was sent.
    Unavailable,
}

impl ClipOutcome {
    pub fn table(&self) -> Option<&ResultTable> {
        match self {
            ClipOutcome::Table(t) => Some(t),
            ClipOutcome::Unavailable => None,
        }
    }

    pub fn into_table(self) -> Option<ResultTable> {
        match self {
            ClipOutcome::Table(t) => Some(t),
            ClipOutcome::Unavailable => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnpClipClient<T = UreqTransport> {
    api_root: String,
    transport: T,
}

impl SnpClipClient<UreqTransport> {
    pub fn new(api_root: &str) -> Self {
        Self::with_transport(api_root, UreqTransport::default())
    }
}

impl<T: Transport> SnpClipClient<T> {
    pub fn with_transport(api_root: &str, transport: T) -> Self {
        Self {
            api_root: api_root.trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/snpclip", self.api_root)
    }

    /// Bodiless reachability check against the bare endpoint.
    pub fn build_probe(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Head,
            url: self.endpoint(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_clip(&self, query: &ClipQuery) -> Result<HttpRequest, ClipError> {
        let body = serde_json::to_string(&query.payload())?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}?&token={}", self.endpoint(), query.token),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// Turn the main response into a table, surfacing remote failures.
    ///
    /// The service reports some failures with a success status and a message
    /// in the body, so the body is always inspected.
    pub fn parse_clip(&self, response: HttpResponse) -> Result<ResultTable, ClipError> {
        if response.is_error() {
            return Err(ClipError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }
        if let Some(message) = json_error(&response.body) {
            return Err(ClipError::Service(message));
        }

        let table = ResultTable::parse_tsv(&response.body)?;
        if let Some(message) = table.in_band_message() {
            return Err(ClipError::Service(message.to_string()));
        }
        if table.is_empty() {
            // A lone line is read as a header; the service may have put its
            // message there.
            let first = response.body.lines().next().unwrap_or_default();
            let cell = first.split('\t').next().unwrap_or_default().trim();
            if is_flagged(cell) {
                return Err(ClipError::Service(cell.to_string()));
            }
        }
        Ok(table)
    }

    /// Returns false, after logging a warning, when the service is unreachable.
    pub fn probe(&self) -> bool {
        match self.transport.execute(self.build_probe()) {
            Ok(response) if !response.is_error() => true,
            Ok(response) => {
                warn!(status = response.status, "{UNAVAILABLE_MESSAGE}");
                false
            }
            Err(e) => {
                warn!(error = %e, "{UNAVAILABLE_MESSAGE}");
                false
            }
        }
    }

    pub fn snp_clip(&self, args: &SnpClipArgs) -> Result<ClipOutcome, ClipError> {
        self.snp_clip_to(args, &mut io::stdout())
    }

    /// As `snp_clip`, echoing a saved table to `out` instead of stdout.
    pub fn snp_clip_to<W: Write>(
        &self,
        args: &SnpClipArgs,
        out: &mut W,
    ) -> Result<ClipOutcome, ClipError> {
        let query = args.validate()?;

        if !self.probe() {
            return Ok(ClipOutcome::Unavailable);
        }

        let request = self.build_clip(&query)?;
        debug!(
            endpoint = %self.endpoint(),
            variants = query.variants.len(),
            genome_build = %query.genome_build,
            "submitting SNPclip request"
        );
        let response = self.transport.execute(request)?;
        let table = self.parse_clip(response)?;
        debug!(rows = table.len(), "SNPclip response parsed");

        if let Some(path) = &query.output {
            table.write_tsv(path)?;
            table.print_to(out)?;
            info!(path = %path.display(), "File saved to {}", path.display());
        }
        Ok(ClipOutcome::Table(table))
    }
}

/// `{"error": "..."}` bodies.
fn json_error(body: &str) -> Option<String> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    match value.get("error")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Run SNPclip against the public LDlink service.
pub fn snp_clip(args: &SnpClipArgs) -> Result<ClipOutcome, ClipError> {
    SnpClipClient::new(DEFAULT_API_ROOT).snp_clip(args)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::TransportError;

    const BASE: &str = "http://localhost:3000/LDlinkRest";
    const TABLE: &str = "RS_Number\tPosition\tAlleles\tDetails\n\
                         rs3\tchr13:32446842\t(C/T)\tVariant kept.\n\
                         rs4\tchr13:32447222\t(A/G)\tVariant in LD with rs3 (R2=0.98), variant removed.\n";

    type Reply = fn(&HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Records every request and answers with a fixed function.
    struct Scripted {
        seen: RefCell<Vec<HttpRequest>>,
        reply: Reply,
    }

    impl Scripted {
        fn new(reply: Reply) -> Self {
            Self {
                seen: RefCell::new(Vec::new()),
                reply,
            }
        }
    }

    impl Transport for &Scripted {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let response = (self.reply)(&request);
            self.seen.borrow_mut().push(request);
            response
        }
    }

    fn always_ok(_: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(200, ""))
    }

    fn client() -> SnpClipClient<Reply> {
        SnpClipClient::with_transport(BASE, always_ok as Reply)
    }

    fn args() -> SnpClipArgs {
        SnpClipArgs::new(["rs3", "rs4"], "abc123")
    }

    fn ok_table(req: &HttpRequest) -> Result<HttpResponse, TransportError> {
        match req.method {
            HttpMethod::Head => Ok(HttpResponse::new(200, "")),
            _ => Ok(HttpResponse::new(200, TABLE)),
        }
    }

    /// Log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a plain-text subscriber and return what it logged.
    fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (result, logs)
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let c = SnpClipClient::with_transport("http://localhost:3000/LDlinkRest/", always_ok as Reply);
        assert_eq!(c.endpoint(), "http://localhost:3000/LDlinkRest/snpclip");
    }

    #[test]
    fn probe_request_has_no_body_or_token() {
        let req = client().build_probe();
        assert_eq!(req.method, HttpMethod::Head);
        assert_eq!(req.url, format!("{BASE}/snpclip"));
        assert!(req.body.is_none());
    }

    #[test]
    fn clip_request_carries_token_and_json_body() {
        let query = args().validate().unwrap();
        let req = client().build_clip(&query).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, format!("{BASE}/snpclip?&token=abc123"));
        assert_eq!(req.header("content-type"), Some("application/json"));

        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["snps"], "rs3\nrs4");
        assert_eq!(body["pop"], "CEU");
        assert_eq!(body["r2_threshold"], "0.1");
        assert_eq!(body["maf_threshold"], "0.01");
        assert_eq!(body["genome_build"], "grch37");
    }

    #[test]
    fn parse_clip_success() {
        let table = client().parse_clip(HttpResponse::new(200, TABLE)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns[0], "RS_Number");
    }

    #[test]
    fn parse_clip_error_status() {
        let err = client()
            .parse_clip(HttpResponse::new(502, "bad gateway"))
            .unwrap_err();
        assert!(matches!(err, ClipError::HttpStatus { status: 502, .. }));
        assert!(err.is_remote());
    }

    #[test]
    fn parse_clip_in_band_error_despite_200() {
        let body = format!("{TABLE}Error: rs99 is not in 1000G reference panel.\t\t\t\n");
        let err = client().parse_clip(HttpResponse::new(200, body)).unwrap_err();
        match err {
            ClipError::Service(msg) => {
                assert_eq!(msg, "Error: rs99 is not in 1000G reference panel.")
            }
            other => panic!("expected Service, got {other:?}"),
        }
    }

    #[test]
    fn parse_clip_single_line_message() {
        let err = client()
            .parse_clip(HttpResponse::new(200, "Warning: no variants passed the MAF filter\n"))
            .unwrap_err();
        assert!(
            matches!(err, ClipError::Service(ref m) if m == "Warning: no variants passed the MAF filter")
        );
    }

    #[test]
    fn parse_clip_json_error() {
        let err = client()
            .parse_clip(HttpResponse::new(200, r#"{"error": "Invalid or expired API token."}"#))
            .unwrap_err();
        assert!(matches!(err, ClipError::Service(ref m) if m == "Invalid or expired API token."));
    }

    #[test]
    fn invalid_arguments_never_reach_the_transport() {
        let scripted = Scripted::new(ok_table);
        let c = SnpClipClient::with_transport(BASE, &scripted);
        let err = c.snp_clip(&SnpClipArgs::new(Vec::<String>::new(), "t")).unwrap_err();
        assert!(matches!(err, ClipError::InvalidArgument(_)));

        let mut bad = args();
        bad.r2_threshold = 1.5;
        assert!(c.snp_clip(&bad).is_err());
        assert!(scripted.seen.borrow().is_empty());
    }

    #[test]
    fn full_call_probes_then_posts() {
        let scripted = Scripted::new(ok_table);
        let c = SnpClipClient::with_transport(BASE, &scripted);
        let outcome = c.snp_clip(&args()).unwrap();
        assert_eq!(outcome.table().map(ResultTable::len), Some(2));

        let seen = scripted.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].method, HttpMethod::Head);
        assert_eq!(seen[1].method, HttpMethod::Post);
    }

    #[test]
    fn unreachable_probe_is_unavailable_not_error() {
        let scripted = Scripted::new(|req| {
            Err(TransportError {
                url: req.url.clone(),
                message: "connection refused".to_string(),
            })
        });
        let c = SnpClipClient::with_transport(BASE, &scripted);
        let outcome = c.snp_clip(&args()).unwrap();
        assert_eq!(outcome, ClipOutcome::Unavailable);
        assert!(outcome.into_table().is_none());
        assert_eq!(scripted.seen.borrow().len(), 1);
    }

    #[test]
    fn unreachable_probe_logs_warning() {
        let scripted = Scripted::new(|req| {
            Err(TransportError {
                url: req.url.clone(),
                message: "connection refused".to_string(),
            })
        });
        let c = SnpClipClient::with_transport(BASE, &scripted);
        let (outcome, logs) = capture_logs(|| c.snp_clip(&args()));
        assert_eq!(outcome.unwrap(), ClipOutcome::Unavailable);
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains(UNAVAILABLE_MESSAGE), "{logs}");
        assert!(logs.contains("connection refused"), "{logs}");
    }

    #[test]
    fn probe_error_status_is_unavailable() {
        let scripted = Scripted::new(|_| Ok(HttpResponse::new(503, "maintenance")));
        let c = SnpClipClient::with_transport(BASE, &scripted);
        let (outcome, logs) = capture_logs(|| c.snp_clip(&args()));
        assert_eq!(outcome.unwrap(), ClipOutcome::Unavailable);
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains(UNAVAILABLE_MESSAGE), "{logs}");
        assert!(logs.contains("status=503"), "{logs}");
    }

    #[test]
    fn main_call_error_status_is_remote_error() {
        let scripted = Scripted::new(|req| match req.method {
            HttpMethod::Head => Ok(HttpResponse::new(200, "")),
            _ => Ok(HttpResponse::new(500, "internal error")),
        });
        let c = SnpClipClient::with_transport(BASE, &scripted);
        let err = c.snp_clip(&args()).unwrap_err();
        assert!(matches!(err, ClipError::HttpStatus { status: 500, .. }));
    }

    #[test]
    fn main_call_transport_failure_is_hard_error() {
        let scripted = Scripted::new(|req| match req.method {
            HttpMethod::Head => Ok(HttpResponse::new(200, "")),
            _ => Err(TransportError {
                url: req.url.clone(),
                message: "connection reset".to_string(),
            }),
        });
        let c = SnpClipClient::with_transport(BASE, &scripted);
        let err = c.snp_clip(&args()).unwrap_err();
        assert!(matches!(err, ClipError::Transport(_)));
        assert!(!err.is_remote());
    }

    #[test]
    fn output_path_writes_file_echoes_and_confirms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snpclip.txt");
        let scripted = Scripted::new(ok_table);
        let c = SnpClipClient::with_transport(BASE, &scripted);

        let mut a = args();
        a.output = Some(path.clone());
        let mut echoed = Vec::new();
        let (outcome, logs) = capture_logs(|| c.snp_clip_to(&a, &mut echoed));
        let table = outcome.unwrap().into_table().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), table.len() + 1);
        assert_eq!(written.lines().next(), Some("RS_Number\tPosition\tAlleles\tDetails"));
        assert_eq!(String::from_utf8(echoed).unwrap(), table.to_string());
        assert!(logs.contains("INFO"), "{logs}");
        assert!(logs.contains(&format!("File saved to {}", path.display())), "{logs}");
    }

    #[test]
    fn no_output_path_echoes_nothing() {
        let scripted = Scripted::new(ok_table);
        let c = SnpClipClient::with_transport(BASE, &scripted);
        let mut echoed = Vec::new();
        c.snp_clip_to(&args(), &mut echoed).unwrap();
        assert!(echoed.is_empty());
    }

    #[test]
    fn closed_stdout_still_saves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snpclip.txt");
        let scripted = Scripted::new(ok_table);
        let c = SnpClipClient::with_transport(BASE, &scripted);

        let mut a = args();
        a.output = Some(path.clone());
        let outcome = c.snp_clip_to(&a, &mut BrokenPipe).unwrap();
        assert_eq!(outcome.table().map(ResultTable::len), Some(2));
        assert!(path.exists());
    }
}
