//! First-request classification.
//!
//! # Responsibilities
//! - Read exactly one request head off a fresh connection
//! - Decide "protocol switch" vs "plain HTTP"
//! - Keep every byte read so nothing is lost on the way to the next owner
//!
//! # Design Decisions
//! - Bounded: the head must fit in `max_head` bytes
//! - Anything unparsable is a classification failure; the caller closes
//! - No response is ever written from here

use axum::http::{
    header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING, UPGRADE},
    HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version,
};
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Maximum total size of a request head (64 KiB).
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Maximum number of headers accepted in a request head.
const MAX_HEADERS: usize = 100;

/// Why a connection could not be classified.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("malformed request head: {0}")]
    Malformed(String),

    #[error("request head exceeds {0} bytes")]
    TooLarge(usize),

    #[error("connection closed mid-head")]
    Truncated,

    #[error("timed out waiting for request head")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The parsed head of the first request on a connection.
#[derive(Debug)]
pub struct RequestHead {
    request: Request<()>,
    /// Every byte read off the socket so far.
    buffered: Bytes,
    /// Length of the head inside `buffered`.
    head_len: usize,
    framing: BodyFraming,
}

/// How the body of a request is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body.
    Empty,
    /// Exactly this many bytes.
    Length(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
}

impl RequestHead {
    /// Method, target, version and headers as received.
    pub fn request(&self) -> &Request<()> {
        &self.request
    }

    /// Request target as sent (path plus optional query).
    pub fn target(&self) -> &str {
        self.request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn framing(&self) -> BodyFraming {
        self.framing
    }

    /// Whether the client asked to switch protocols.
    pub fn is_upgrade(&self) -> bool {
        is_upgrade_request(self.request.headers())
    }

    /// The request head bytes exactly as received.
    pub fn raw_head(&self) -> &[u8] {
        &self.buffered[..self.head_len]
    }

    /// Bytes received after the head (early body or protocol data).
    pub fn trailing(&self) -> &[u8] {
        &self.buffered[self.head_len..]
    }

    /// Split into the parsed request, all buffered bytes and the head length.
    pub fn into_parts(self) -> (Request<()>, Bytes, usize) {
        (self.request, self.buffered, self.head_len)
    }
}

/// Does this header set ask for a protocol switch?
///
/// Requires an `Upgrade` header and the `upgrade` token in `Connection`
/// (which may be a list and may be repeated).
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let has_upgrade = headers
        .get(UPGRADE)
        .map(|v| !v.as_bytes().is_empty())
        .unwrap_or(false);

    let connection_upgrade = headers.get_all(CONNECTION).iter().any(|value| {
        value
            .to_str()
            .map(|v| v.split(',').any(|token| token.trim().eq_ignore_ascii_case("upgrade")))
            .unwrap_or(false)
    });

    has_upgrade && connection_upgrade
}

/// Read one request head from `io`.
///
/// Returns `Ok(None)` when the peer closes before sending anything.
pub async fn read_request_head<R>(io: &mut R, max_head: usize) -> Result<Option<RequestHead>, ClassifyError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        if io.read_buf(&mut buf).await? == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(ClassifyError::Truncated)
            };
        }

        if let Some((request, head_len, framing)) = parse_request_head(&buf, max_head)? {
            return Ok(Some(RequestHead {
                request,
                buffered: buf.freeze(),
                head_len,
                framing,
            }));
        }
        if buf.capacity() == buf.len() {
            buf.reserve(4096);
        }
    }
}

/// Parse one request head from the front of `buf`.
///
/// Returns `Ok(None)` while the head is incomplete. Heads the HTTP engine
/// would answer with an error of its own are refused here instead.
pub fn parse_request_head(
    buf: &[u8],
    max_head: usize,
) -> Result<Option<(Request<()>, usize, BodyFraming)>, ClassifyError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut headers);
    match parsed.parse(buf) {
        Ok(httparse::Status::Complete(head_len)) => {
            if head_len > max_head {
                return Err(ClassifyError::TooLarge(max_head));
            }
            let request = build_request(&parsed)?;
            let framing = body_framing(&request)?;
            Ok(Some((request, head_len, framing)))
        }
        Ok(httparse::Status::Partial) if buf.len() >= max_head => Err(ClassifyError::TooLarge(max_head)),
        Ok(httparse::Status::Partial) => Ok(None),
        Err(e) => Err(ClassifyError::Malformed(e.to_string())),
    }
}

/// Work out body framing, refusing ambiguous combinations.
///
/// Refused: repeated or non-numeric `Content-Length`, `Content-Length`
/// alongside `Transfer-Encoding`, `Transfer-Encoding` on HTTP/1.0, and a
/// `Transfer-Encoding` whose final coding is not `chunked`.
pub fn body_framing(request: &Request<()>) -> Result<BodyFraming, ClassifyError> {
    let malformed = |what: &str| ClassifyError::Malformed(what.to_string());
    let headers = request.headers();

    let mut lengths = headers.get_all(CONTENT_LENGTH).iter();
    let length = match (lengths.next(), lengths.next()) {
        (None, _) => None,
        (Some(_), Some(_)) => return Err(malformed("repeated content-length")),
        (Some(value), None) => {
            let digits = value.as_bytes();
            if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
                return Err(malformed("invalid content-length"));
            }
            let length = std::str::from_utf8(digits)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| malformed("invalid content-length"))?;
            Some(length)
        }
    };

    if !headers.contains_key(TRANSFER_ENCODING) {
        return Ok(match length {
            None | Some(0) => BodyFraming::Empty,
            Some(n) => BodyFraming::Length(n),
        });
    }

    if length.is_some() {
        return Err(malformed("content-length with transfer-encoding"));
    }
    if request.version() == Version::HTTP_10 {
        return Err(malformed("transfer-encoding on HTTP/1.0"));
    }

    let mut last_coding = None;
    for value in headers.get_all(TRANSFER_ENCODING) {
        let value = value
            .to_str()
            .map_err(|_| malformed("invalid transfer-encoding"))?;
        if let Some(coding) = value.split(',').map(str::trim).filter(|c| !c.is_empty()).last() {
            last_coding = Some(coding.to_string());
        }
    }
    match last_coding {
        Some(coding) if coding.eq_ignore_ascii_case("chunked") => Ok(BodyFraming::Chunked),
        _ => Err(malformed("transfer-encoding not ending in chunked")),
    }
}

fn build_request(parsed: &httparse::Request<'_, '_>) -> Result<Request<()>, ClassifyError> {
    let malformed = |what: &str| ClassifyError::Malformed(what.to_string());

    let method = parsed
        .method
        .ok_or_else(|| malformed("missing method"))
        .and_then(|m| Method::from_bytes(m.as_bytes()).map_err(|_| malformed("invalid method")))?;

    let uri: Uri = parsed
        .path
        .ok_or_else(|| malformed("missing target"))?
        .parse()
        .map_err(|_| malformed("invalid target"))?;

    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        _ => return Err(malformed("unsupported version")),
    };

    let mut headers = HeaderMap::with_capacity(parsed.headers.len());
    for header in parsed.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes())
            .map_err(|_| malformed("invalid header name"))?;
        let value =
            HeaderValue::from_bytes(header.value).map_err(|_| malformed("invalid header value"))?;
        headers.append(name, value);
    }

    let mut request = Request::new(());
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.version_mut() = version;
    *request.headers_mut() = headers;
    Ok(request)
}
