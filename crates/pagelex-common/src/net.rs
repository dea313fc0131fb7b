//! Opening URLs as byte streams for the lexer.
//!
//! A [`Connection`] pairs the response body with the content type the server
//! (or the `data:` URL metadata) declared, so the page can pick a charset
//! before decoding the first byte.
//!
//! Supported schemes: `http:`, `https:` (blocking `reqwest`), `data:` and `file:`.
use base64::Engine;
use std::error::Error as _;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// User-Agent header sent with all requests.
///
/// Mimics a common desktop browser to avoid basic bot detection.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default request timeout.
const TIMEOUT: Duration = Duration::from_secs(30);

/// Content type assumed for `data:` URLs without a media type.
const DATA_URL_DEFAULT_TYPE: &str = "text/plain;charset=US-ASCII";

/// Messages used when the host of a URL cannot be found.
///
/// One is picked pseudo-randomly for each failure. Purely cosmetic.
const FOUR_OH_FOUR: [&str; 10] = [
    "The web site you seek cannot be located, but countless more exist",
    "You step in the stream, but the water has moved on. This page is not here.",
    "Yesterday the page existed. Today it does not. The internet is like that.",
    "That page was so big. It might have been very useful. But now it is gone.",
    "Three things are certain: death, taxes and broken links. Guess which has occurred.",
    "Chaos reigns within. Reflect, repent and enter the correct URL. Order shall return.",
    "Stay the patient course. Of little worth is your ire. The page is not found.",
    "A non-existent URL reduces your expensive computer to a simple stone.",
    "Many people have visited that page. Today, you are not one of the lucky ones.",
    "Cutting the wind with a knife. Bookmarking a URL. Both are ephemeral.",
];

/// Errors produced while opening a URL.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The host name could not be resolved.
    #[error("{message} ({host})")]
    HostNotFound {
        /// The host that failed to resolve.
        host: String,
        /// A human-readable, deliberately whimsical explanation.
        message: &'static str,
    },
    /// The HTTP client could not be built or the request failed.
    #[error("request to {url} failed")]
    Request {
        /// The URL that was requested.
        url: String,
        /// The underlying client error.
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("HTTP error {status} for {url}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// A `data:` URL could not be decoded.
    #[error("invalid data URL: {0}")]
    DataUrl(String),
    /// A `file:` URL could not be opened.
    #[error("cannot open {path}")]
    File {
        /// The local path.
        path: String,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// The URL scheme is not one we can open.
    #[error("unsupported URL scheme in {0}")]
    UnsupportedScheme(String),
}

/// An opened URL: where it came from, what it claims to be, and its bytes.
pub struct Connection {
    url: String,
    content_type: Option<String>,
    body: Box<dyn Read>,
}

impl Connection {
    /// Wrap an already opened byte stream.
    #[must_use]
    pub fn new(url: String, content_type: Option<String>, body: Box<dyn Read>) -> Self {
        Self {
            url,
            content_type,
            body,
        }
    }

    /// The URL this connection was opened for.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The declared content type, e.g. `text/html; charset=UTF-8`.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Split into URL, content type and body stream.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<String>, Box<dyn Read>) {
        (self.url, self.content_type, self.body)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// A parsed `data:` URL that can be decoded into raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// The media type, including parameters such as `charset`.
    pub media_type: String,
    /// Whether the payload is base64 encoded (otherwise percent-encoded).
    pub base64: bool,
    /// The raw payload after the comma.
    pub payload: String,
}

impl DataUrl {
    /// Parse a `data:` URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::DataUrl`] if the URL lacks the `data:` prefix or the comma
    /// separating metadata from payload.
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let Some(rest) = strip_scheme(raw, "data:") else {
            return Err(FetchError::DataUrl(format!("not a data URL: {raw}")));
        };
        let Some((metadata, payload)) = rest.split_once(',') else {
            return Err(FetchError::DataUrl("missing comma".to_string()));
        };
        let (media_type, base64) = match metadata.strip_suffix(";base64") {
            Some(media_type) => (media_type, true),
            None => (metadata, false),
        };
        let media_type = if media_type.is_empty() {
            DATA_URL_DEFAULT_TYPE.to_string()
        } else if media_type.starts_with(';') {
            format!("text/plain{media_type}")
        } else {
            media_type.to_string()
        };
        Ok(Self {
            media_type,
            base64,
            payload: payload.to_string(),
        })
    }

    /// Decode the payload into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::DataUrl`] if base64 decoding fails or a percent escape
    /// is malformed.
    pub fn decode(&self) -> Result<Vec<u8>, FetchError> {
        if self.base64 {
            base64::engine::general_purpose::STANDARD
                .decode(self.payload.trim())
                .map_err(|e| FetchError::DataUrl(format!("base64 decode error: {e}")))
        } else {
            percent_decode(&self.payload)
        }
    }
}

fn percent_decode(payload: &str) -> Result<Vec<u8>, FetchError> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| FetchError::DataUrl(format!("bad percent escape at {i}")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    url.get(..scheme.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
        .map(|_| &url[scheme.len()..])
}

/// Extract the host part of an absolute URL, for error messages.
fn host_of(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(url, |i| &url[i + 3..]);
    let end = after_scheme
        .find(['/', ':', '?', '#'])
        .unwrap_or(after_scheme.len());
    &after_scheme[..end]
}

/// Pick one of the host-not-found messages.
#[must_use]
pub fn four_oh_four_message() -> &'static str {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos());
    let index = usize::try_from(nanos).unwrap_or(0) % FOUR_OH_FOUR.len();
    FOUR_OH_FOUR[index]
}

fn is_host_not_found(err: &reqwest::Error) -> bool {
    if !err.is_connect() {
        return false;
    }
    let mut cause = err.source();
    while let Some(inner) = cause {
        let text = inner.to_string();
        if text.contains("dns error")
            || text.contains("failed to lookup address")
            || text.contains("Name or service not known")
            || text.contains("No such host")
        {
            return true;
        }
        cause = inner.source();
    }
    false
}

/// Open a URL and return its body as a byte stream with its content type.
///
/// # Errors
///
/// Returns a [`FetchError`] if the scheme is unsupported, the host cannot be
/// found, the request fails, the server answers with a non-success status, or
/// a `data:`/`file:` URL cannot be read.
pub fn open(url: &str) -> Result<Connection, FetchError> {
    if strip_scheme(url, "data:").is_some() {
        let data = DataUrl::parse(url)?;
        let bytes = data.decode()?;
        log::debug!(target: "pagelex::net", "decoded data URL: {} bytes", bytes.len());
        return Ok(Connection::new(
            url.to_string(),
            Some(data.media_type),
            Box::new(io::Cursor::new(bytes)),
        ));
    }

    if let Some(path) = strip_scheme(url, "file://") {
        let file = File::open(path).map_err(|source| FetchError::File {
            path: path.to_string(),
            source,
        })?;
        return Ok(Connection::new(url.to_string(), None, Box::new(file)));
    }

    if strip_scheme(url, "http://").is_none() && strip_scheme(url, "https://").is_none() {
        return Err(FetchError::UnsupportedScheme(url.to_string()));
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(TIMEOUT)
        .build()
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .send()
        .map_err(|source| {
            if is_host_not_found(&source) {
                FetchError::HostNotFound {
                    host: host_of(url).to_string(),
                    message: four_oh_four_message(),
                }
            } else {
                FetchError::Request {
                    url: url.to_string(),
                    source,
                }
            }
        })?;

    if !response.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    log::debug!(target: "pagelex::net", "opened {url} ({content_type:?})");

    Ok(Connection::new(
        response.url().to_string(),
        content_type,
        Box::new(response),
    ))
}
