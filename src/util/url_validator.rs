use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Longest URL handed to the system browser.
const MAX_OPEN_URL_LENGTH: usize = 2048;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    #[error("Localhost not allowed")]
    Localhost,
    #[error("URL too long ({0} bytes)")]
    TooLong(usize),
}

/// Validate a URL that points at a public web host.
///
/// Rejects non-HTTP(S) schemes, localhost and loopback addresses, and
/// private, link-local or unique-local IP ranges.
///
/// ```
/// use novella::util::validate_url;
///
/// assert!(validate_url("https://example.com/novel/item?title=x").is_ok());
/// assert!(validate_url("http://localhost/").is_err());
/// assert!(validate_url("http://192.168.1.1/").is_err());
/// assert!(validate_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedScheme(url.scheme().to_owned()));
    }

    match url.host() {
        Some(url::Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => {
            return Err(UrlValidationError::Localhost)
        }
        Some(url::Host::Ipv4(v4)) => check_ip(IpAddr::V4(v4))?,
        Some(url::Host::Ipv6(v6)) => check_ip(IpAddr::V6(v6))?,
        _ => {}
    }

    Ok(url)
}

/// Validate a URL before passing it to `open::that`.
///
/// Same policy as [`validate_url`], plus a length cap. The parsed form is
/// returned so callers open the normalized URL, never the raw input.
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    if url_str.len() > MAX_OPEN_URL_LENGTH {
        return Err(UrlValidationError::TooLong(url_str.len()));
    }
    validate_url(url_str)
}

fn check_ip(ip: IpAddr) -> Result<(), UrlValidationError> {
    if ip.is_loopback() {
        return Err(UrlValidationError::Localhost);
    }
    let private = match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
        }
    };
    if private {
        return Err(UrlValidationError::PrivateIp(ip.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_urls_accepted() {
        assert!(validate_url("https://prpropertystore.com/novel/item?title=a").is_ok());
        assert!(validate_url("http://example.org:8080/x").is_ok());
    }

    #[test]
    fn test_schemes_rejected() {
        assert!(matches!(
            validate_url("javascript:alert(1)"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_local_hosts_rejected() {
        assert!(matches!(
            validate_url("http://LOCALHOST/"),
            Err(UrlValidationError::Localhost)
        ));
        assert!(validate_url("http://127.0.0.1/").is_err());
        assert!(validate_url("http://[::1]/").is_err());
        assert!(validate_url("http://0.0.0.0/").is_err());
    }

    #[test]
    fn test_private_ranges_rejected() {
        for url in [
            "http://10.0.0.1/",
            "http://172.16.0.1/",
            "http://192.168.1.1:3000/",
            "http://169.254.1.1/",
            "http://[fe80::1]/",
            "http://[fd00::1]/",
        ] {
            assert!(
                matches!(validate_url(url), Err(UrlValidationError::PrivateIp(_))),
                "{} should be rejected as private",
                url
            );
        }
    }

    #[test]
    fn test_open_rejects_overlong_urls() {
        let long = format!("https://example.com/{}", "a".repeat(MAX_OPEN_URL_LENGTH));
        assert!(matches!(
            validate_url_for_open(&long),
            Err(UrlValidationError::TooLong(_))
        ));
    }

    #[test]
    fn test_open_returns_normalized_url() {
        let url = validate_url_for_open("https://Example.com/novel/item?title=a b").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(!url.as_str().contains(' '));
    }
}
