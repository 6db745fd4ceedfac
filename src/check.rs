//! Initial URL check.
//!
//! Rejects obviously unusable input before the expensive exploration starts.

use log::debug;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error_handling::CheckError;
use crate::probe::{dns_lookup, ProbeConfig};

/// Validates `raw` and makes sure its hostname resolves.
///
/// IP literals are accepted without a lookup.
///
/// # Returns
///
/// The parsed URL.
///
/// # Errors
///
/// - `CheckError::InvalidUrl` if `raw` does not parse or has no host
/// - `CheckError::UnsupportedScheme` unless the scheme is `http` or `https`
/// - `CheckError::NoSuchHost` if the hostname does not resolve
pub async fn initial_check(
    raw: &str,
    probe: &ProbeConfig,
    cancel: &CancellationToken,
) -> Result<Url, CheckError> {
    let url = Url::parse(raw)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(CheckError::UnsupportedScheme(url.scheme().to_string()));
    }
    let host = match url.host() {
        Some(url::Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(url::Host::Domain(_)) | None => return Err(url::ParseError::EmptyHost.into()),
        Some(_) => {
            debug!("initial check {url}: IP literal, skipping lookup");
            return Ok(url);
        }
    };
    dns_lookup(probe, &host, cancel)
        .await
        .map_err(|source| CheckError::NoSuchHost {
            domain: host,
            source,
        })?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::BoxError;
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::sync::Arc;

    struct StaticResolver;

    #[async_trait]
    impl crate::probe::Resolver for StaticResolver {
        async fn lookup_host(&self, domain: &str) -> Result<Vec<IpAddr>, BoxError> {
            if domain == "example.com" {
                Ok(vec!["93.184.216.34".parse()?])
            } else {
                Err(crate::classify::DnsError::NoSuchHost.into())
            }
        }
    }

    fn probe() -> ProbeConfig {
        ProbeConfig::new(Arc::new(StaticResolver))
    }

    #[tokio::test]
    async fn test_valid_url() {
        let url = initial_check("https://example.com/path", &probe(), &CancellationToken::new())
            .await
            .expect("check should pass");
        assert_eq!(url.path(), "/path");
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = initial_check("not a url", &probe(), &CancellationToken::new())
            .await
            .expect_err("should fail");
        assert!(matches!(err, CheckError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let err = initial_check("ftp://example.com/", &probe(), &CancellationToken::new())
            .await
            .expect_err("should fail");
        assert!(matches!(err, CheckError::UnsupportedScheme(s) if s == "ftp"));
    }

    #[tokio::test]
    async fn test_no_such_host() {
        let err = initial_check("http://nonexistent.invalid/", &probe(), &CancellationToken::new())
            .await
            .expect_err("should fail");
        match err {
            CheckError::NoSuchHost { domain, source } => {
                assert_eq!(domain, "nonexistent.invalid");
                assert_eq!(source.failure(), "dns_nxdomain_error");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ip_literal_skips_lookup() {
        let url = initial_check("http://[2001:db8::1]:8080/", &probe(), &CancellationToken::new())
            .await
            .expect("IP literal should pass");
        assert_eq!(url.port(), Some(8080));
    }
}
