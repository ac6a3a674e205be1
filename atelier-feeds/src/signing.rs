//! Canonical-request signing (`AWS4-HMAC-SHA256`).
//!
//! Binds a request's method, path, headers and body to a secret key in four
//! stages:
//!
//! 1. canonical request: method, URI, query, sorted lower-cased headers,
//!    signed-header list and the hex SHA-256 of the body
//! 2. string to sign: algorithm, timestamp, credential scope and the hex
//!    SHA-256 of the canonical request
//! 3. signing key: HMAC chain over date, region, service and `aws4_request`
//! 4. signature: hex HMAC of the string to sign under the signing key
//!
//! The timestamp comes from an injectable [`Clock`], so signing is fully
//! deterministic under a [`FixedClock`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Algorithm identifier placed in the string to sign and the header.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Literal terminating the credential scope and the signing-key chain.
const SCOPE_TERMINATOR: &str = "aws4_request";

/// Content type added when the caller did not set one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

type HmacSha256 = Hmac<Sha256>;

/// Lower-cased header name → value, iterated in sorted order.
pub type HeaderSet = BTreeMap<String, String>;

/// Time source for request timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant, for reproducible signatures.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A required signer input was empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("missing signing input: {0}")]
    MissingCredential(&'static str),
}

/// The parts of an outgoing request covered by the signature.
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    pub method: &'a str,
    /// Canonical URI path, already percent-encoded.
    pub path: &'a str,
    pub host: &'a str,
    /// Extra headers to sign. Names are matched case-insensitively.
    pub headers: &'a [(&'a str, &'a str)],
    pub body: &'a [u8],
}

/// Signs requests for one credential pair, region and service.
pub struct RequestSigner {
    access_key: String,
    secret_key: String,
    region: String,
    service: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::MissingCredential`] if any input is empty.
    pub fn new(
        access_key: &str,
        secret_key: &str,
        region: &str,
        service: &str,
    ) -> Result<Self, SigningError> {
        for (value, name) in [
            (access_key, "access key"),
            (secret_key, "secret key"),
            (region, "region"),
            (service, "service"),
        ] {
            if value.trim().is_empty() {
                return Err(SigningError::MissingCredential(name));
            }
        }
        Ok(Self {
            access_key: access_key.to_owned(),
            secret_key: secret_key.to_owned(),
            region: region.to_owned(),
            service: service.to_owned(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sign a request, returning the full header set to send.
    ///
    /// The result contains every caller header (lower-cased), `host` when
    /// the caller did not supply it, `content-type` when the caller did not
    /// supply one and the body is non-empty, `x-amz-date`, and finally
    /// `authorization`, which is not itself signed.
    pub fn sign(&self, request: &SignableRequest<'_>) -> HeaderSet {
        let now = self.clock.now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();

        let mut headers: HeaderSet = request
            .headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), value.trim().to_owned()))
            .collect();
        headers
            .entry("host".into())
            .or_insert_with(|| request.host.to_owned());
        if !request.body.is_empty() {
            headers
                .entry("content-type".into())
                .or_insert_with(|| DEFAULT_CONTENT_TYPE.to_owned());
        }
        headers.insert("x-amz-date".into(), amz_date.clone());

        let canonical = canonical_request(request.method, request.path, "", &headers, request.body);
        let scope = credential_scope(&date_stamp, &self.region, &self.service);
        let to_sign = string_to_sign(&amz_date, &scope, &canonical);
        let key = derive_signing_key(&self.secret_key, &date_stamp, &self.region, &self.service);
        let signature = hex(&hmac_sha256(&key, to_sign.as_bytes()));

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
            self.access_key,
            signed_header_names(&headers),
        );
        tracing::trace!(service = %self.service, %amz_date, "request signed");

        headers.insert("authorization".into(), authorization);
        headers
    }
}

/// Build the canonical request string.
///
/// Header values are trimmed and inner whitespace runs collapse to one
/// space. Every header line ends in `\n`, so the header block is followed
/// by an empty line before the signed-header list.
pub fn canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers: &HeaderSet,
    body: &[u8],
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| {
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("{name}:{value}\n")
        })
        .collect();
    format!(
        "{method}\n{path}\n{query}\n{canonical_headers}\n{}\n{}",
        signed_header_names(headers),
        sha256_hex(body)
    )
}

/// `date/region/service/aws4_request`.
pub fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{date_stamp}/{region}/{service}/{SCOPE_TERMINATOR}")
}

pub fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    )
}

/// Derive the signing key: `HMAC(HMAC(HMAC(HMAC("AWS4"+secret, date), region), service), "aws4_request")`.
pub fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

fn signed_header_names(headers: &HeaderSet) -> String {
    headers.keys().map(String::as_str).collect::<Vec<_>>().join(";")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("{digest:x}")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
