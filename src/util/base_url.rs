use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors raised while validating the marketplace base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP was requested for a host that is not loopback.
    #[error("Insecure base URL: HTTPS required (except loopback hosts)")]
    Insecure,
    /// The URL has no host component.
    #[error("Base URL has no host")]
    MissingHost,
}

/// Validates the marketplace API base URL and normalises it for joining.
///
/// Rules:
/// - Scheme must be `https`, or `http` when the host is `localhost` or a
///   loopback address. The auth token travels in request headers, so a plain
///   HTTP endpoint on a public host is refused.
/// - Query string and fragment are dropped.
/// - The path always ends with `/`, so `Url::join("nftitems/fetchTokens")`
///   appends instead of replacing the last segment.
///
/// ```
/// use zoo_explore::util::validate_base_url;
///
/// assert!(validate_base_url("https://api.example.io").is_ok());
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// assert!(validate_base_url("http://api.example.io").is_err());
/// assert!(validate_base_url("ftp://api.example.io").is_err());
/// ```
pub fn validate_base_url(raw: &str) -> Result<Url, UrlValidationError> {
    let mut url = Url::parse(raw.trim())?;

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    match url.scheme() {
        "https" => {}
        "http" if is_loopback_host(host) => {
            tracing::warn!(base_url = %url, "Using non-HTTPS marketplace URL (loopback only)");
        }
        "http" => return Err(UrlValidationError::Insecure),
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse::<IpAddr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}
