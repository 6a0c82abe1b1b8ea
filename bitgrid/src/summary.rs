//! Group summary contract: per-KB set-bit fractions computed out of process.
//!
//! The client half (`SummaryFetcher`) is an optimization only. Every failure
//! is logged and turned into "no summary", after which the renderer uses the
//! local closed form. The server half (`handle_summary_request`) is a pure
//! function any HTTP host can mount at [`SUMMARY_PATH`].

use crate::engine::density::block_density;
use crate::engine::levels::block_count_at;
use crate::error::SummaryError;
use crate::limits::{round_fraction, saturating_u64, SUMMARY_KB_CAP};
use crate::model::{Level, RenderPlan};
use num_bigint::BigUint;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use tracing::{debug, warn};

pub const SUMMARY_PATH: &str = "/api/group_summary";
pub const SUMMARY_MODE: &str = "bitcount";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRequest {
    /// Decimal string of the total bit count.
    pub value: String,
    pub mode: String,
}

impl SummaryRequest {
    pub fn for_total_bits(total_bits: &BigUint) -> Self {
        SummaryRequest { value: total_bits.to_string(), mode: SUMMARY_MODE.to_string() }
    }

    pub fn to_json(&self) -> Result<String, SummaryError> { Ok(serde_json::to_string(self)?) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_count: Option<u64>,
    pub kb_fractions: Vec<f64>,
}

fn parse_value(v: Option<&Value>) -> Result<BigUint, SummaryError> {
    match v {
        None => Ok(BigUint::default()),
        Some(Value::String(s)) => s.trim().parse::<BigUint>().map_err(|_| SummaryError::InvalidValue(s.clone())),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(BigUint::from)
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0).and_then(BigUint::from_f64))
            .ok_or_else(|| SummaryError::InvalidValue(n.to_string())),
        Some(other) => Err(SummaryError::InvalidValue(other.to_string())),
    }
}

/// Server side of the contract.
///
/// `value` defaults to `"0"` and `mode` to `"bitcount"`; only bitcount mode
/// is summarized.
pub fn handle_summary_request(body: &str, cap: u64) -> Result<SummaryResponse, SummaryError> {
    let data: Value = serde_json::from_str(body).map_err(|e| SummaryError::InvalidJson(e.to_string()))?;
    let obj = data.as_object().ok_or_else(|| SummaryError::InvalidJson("expected a JSON object".to_string()))?;
    let total_bits = parse_value(obj.get("value"))?;
    let mode = match obj.get("mode") {
        None => SUMMARY_MODE,
        Some(Value::String(s)) => s.as_str(),
        Some(other) => return Err(SummaryError::ModeNotSupported(other.to_string())),
    };
    if mode != SUMMARY_MODE {
        return Err(SummaryError::ModeNotSupported(mode.to_string()));
    }
    summarize_kb_fractions(&total_bits, cap)
}

/// `max(1, ceil(total / 8192))` fractions, each rounded to six decimals.
pub fn summarize_kb_fractions(total_bits: &BigUint, cap: u64) -> Result<SummaryResponse, SummaryError> {
    let count = block_count_at(total_bits, Level::Kb);
    if count > BigUint::from(cap) {
        return Err(SummaryError::TooLarge { group_count: count.to_string(), cap });
    }
    let n = saturating_u64(&count);
    let kb_fractions = (0..n).map(|i| round_fraction(block_density(total_bits, Level::Kb, i))).collect();
    Ok(SummaryResponse { group_count: Some(n), kb_fractions })
}

/// Validate a service answer for `total_bits`.
pub fn parse_summary_response(status: u16, body: &str, total_bits: &BigUint) -> Result<Vec<f64>, SummaryError> {
    if !(200..300).contains(&status) {
        return Err(SummaryError::Status(status));
    }
    let resp: SummaryResponse = serde_json::from_str(body)?;
    let expected = block_count_at(total_bits, Level::Kb);
    let got = resp.kb_fractions.len();
    if BigUint::from(got) != expected {
        return Err(SummaryError::Malformed(format!("expected {expected} fractions, got {got}")));
    }
    if let Some(gc) = resp.group_count {
        if gc != got as u64 {
            return Err(SummaryError::Malformed(format!("group_count {gc} disagrees with {got} fractions")));
        }
    }
    if let Some(bad) = resp.kb_fractions.iter().find(|f| !f.is_finite() || **f < 0.0 || **f > 1.0) {
        return Err(SummaryError::Malformed(format!("fraction out of range: {bad}")));
    }
    Ok(resp.kb_fractions)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Carries one JSON POST to the summary service.
pub trait SummaryTransport {
    fn post_json(&self, path: &str, body: String) -> impl Future<Output = Result<TransportResponse, SummaryError>>;
}

pub struct SummaryFetcher<T> {
    transport: T,
    cap: u64,
}

impl<T: SummaryTransport> SummaryFetcher<T> {
    pub fn new(transport: T) -> Self { SummaryFetcher { transport, cap: SUMMARY_KB_CAP } }

    pub fn with_cap(mut self, cap: u64) -> Self {
        self.cap = cap;
        self
    }

    pub fn transport(&self) -> &T { &self.transport }

    /// Only plans above KB whose KB count fits the cap are worth a request.
    pub fn wants(&self, plan: &RenderPlan) -> bool {
        plan.level > Level::Kb && plan.kb_count() <= BigUint::from(self.cap)
    }

    pub async fn request_kb_fractions(&self, total_bits: &BigUint) -> Result<Vec<f64>, SummaryError> {
        let req = SummaryRequest::for_total_bits(total_bits);
        let resp = self.transport.post_json(SUMMARY_PATH, req.to_json()?).await?;
        parse_summary_response(resp.status, &resp.body, total_bits)
    }

    pub async fn fetch_or_fallback(&self, total_bits: &BigUint) -> Option<Vec<f64>> {
        match self.request_kb_fractions(total_bits).await {
            Ok(kb) => {
                debug!(groups = kb.len(), "group summary received");
                Some(kb)
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "group summary unavailable; using local densities");
                None
            }
        }
    }
}

/// In-process summary service speaking the HTTP contract.
#[derive(Clone, Debug)]
pub struct LocalSummaryService {
    pub cap: u64,
}

impl Default for LocalSummaryService {
    fn default() -> Self { LocalSummaryService { cap: SUMMARY_KB_CAP } }
}

impl LocalSummaryService {
    /// Status and JSON body for a request body, as the HTTP endpoint answers it.
    pub fn respond(&self, body: &str) -> TransportResponse {
        match handle_summary_request(body, self.cap).and_then(|r| serde_json::to_string(&r).map_err(SummaryError::from)) {
            Ok(body) => TransportResponse { status: 200, body },
            Err(e) => TransportResponse { status: 400, body: json!({ "error": e.code() }).to_string() },
        }
    }
}

impl SummaryTransport for LocalSummaryService {
    async fn post_json(&self, path: &str, body: String) -> Result<TransportResponse, SummaryError> {
        if path != SUMMARY_PATH {
            return Ok(TransportResponse { status: 404, body: json!({ "error": "not_found" }).to_string() });
        }
        Ok(self.respond(&body))
    }
}

#[cfg(feature = "remote-summary")]
pub use http::HttpTransport;

#[cfg(feature = "remote-summary")]
mod http {
    use super::{SummaryTransport, TransportResponse};
    use crate::error::SummaryError;
    use std::time::Duration;

    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Native transport posting to `{base_url}/api/group_summary`.
    #[derive(Clone, Debug)]
    pub struct HttpTransport {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpTransport {
        pub fn new(base_url: impl Into<String>) -> Result<Self, SummaryError> {
            let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
            Ok(HttpTransport { client, base_url: base_url.into() })
        }
    }

    impl SummaryTransport for HttpTransport {
        async fn post_json(&self, path: &str, body: String) -> Result<TransportResponse, SummaryError> {
            let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
            let resp = self
                .client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?;
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            Ok(TransportResponse { status, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_rounds_and_pads_to_one_group() {
        let r = handle_summary_request(r#"{"value":"0","mode":"bitcount"}"#, SUMMARY_KB_CAP).unwrap();
        assert_eq!(r.group_count, Some(1));
        assert_eq!(r.kb_fractions, vec![0.0]);
        let r = handle_summary_request(r#"{"value":"10000"}"#, SUMMARY_KB_CAP).unwrap();
        assert_eq!(r.kb_fractions, vec![1.0, 0.220703]);
    }

    #[test]
    fn server_error_codes() {
        let code = |b: &str| handle_summary_request(b, SUMMARY_KB_CAP).unwrap_err().code();
        assert_eq!(code("not json"), "invalid_json");
        assert_eq!(code("[1,2]"), "invalid_json");
        assert_eq!(code(r#"{"value":"-5"}"#), "invalid_value");
        assert_eq!(code(r#"{"value":"abc"}"#), "invalid_value");
        assert_eq!(code(r#"{"value":-5}"#), "invalid_value");
        assert_eq!(code(r#"{"value":"5","mode":"binary"}"#), "mode_not_supported");
        assert_eq!(code(r#"{"value":"999999999999999"}"#), "too_large");
    }

    #[test]
    fn numeric_value_is_accepted() {
        let r = handle_summary_request(r#"{"value":16384}"#, SUMMARY_KB_CAP).unwrap();
        assert_eq!(r.kb_fractions, vec![1.0, 1.0]);
    }

    #[test]
    fn integral_float_value_is_accepted() {
        let r = handle_summary_request(r#"{"value":16384.0}"#, SUMMARY_KB_CAP).unwrap();
        assert_eq!(r.kb_fractions, vec![1.0, 1.0]);
        let code = |b: &str| handle_summary_request(b, SUMMARY_KB_CAP).unwrap_err().code();
        assert_eq!(code(r#"{"value":16384.5}"#), "invalid_value");
        assert_eq!(code(r#"{"value":-8.0}"#), "invalid_value");
    }

    #[test]
    fn request_body_shape() {
        let req = SummaryRequest::for_total_bits(&BigUint::from(41_943_040u64));
        let v: Value = serde_json::from_str(&req.to_json().unwrap()).unwrap();
        assert_eq!(v["value"], "41943040");
        assert_eq!(v["mode"], "bitcount");
    }

    #[test]
    fn response_validation() {
        let total = BigUint::from(16_384u32);
        assert_eq!(parse_summary_response(200, r#"{"kb_fractions":[1,1]}"#, &total).unwrap(), vec![1.0, 1.0]);
        assert_eq!(parse_summary_response(500, "", &total).unwrap_err(), SummaryError::Status(500));
        let bad = [
            r#"{"kb_fractions":[1]}"#,
            r#"{"kb_fractions":[1,1.5]}"#,
            r#"{"kb_fractions":[1,1],"group_count":3}"#,
            r#"{"fractions":[1,1]}"#,
            "<html>",
        ];
        for body in bad {
            assert_eq!(parse_summary_response(200, body, &total).unwrap_err().code(), "malformed", "{body}");
        }
    }
}
