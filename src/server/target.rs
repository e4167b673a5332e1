use crate::error::TubeError;
use url::Url;

/// Parse the caller-supplied proxy target.
///
/// Accepts only absolute `http://` and `https://` URLs with a host. No host
/// allow-list is applied: the proxy fetches whatever the caller names.
///
/// # Errors
/// Returns [`TubeError::InvalidTarget`] for:
/// - Relative or unparsable URLs
/// - Non-HTTP(S) schemes
/// - URLs without a host
pub fn parse_target_url(raw: &str) -> Result<Url, TubeError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| TubeError::InvalidTarget(format!("{raw}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(TubeError::InvalidTarget(format!(
                "scheme '{scheme}' not allowed, only http/https"
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(TubeError::InvalidTarget(format!("no host in {raw}")));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(parse_target_url("http://cdn.example/live.m3u8").is_ok());
        assert!(parse_target_url("https://cdn.example/seg.ts?token=abc&exp=1").is_ok());
    }

    #[test]
    fn accepts_private_addresses() {
        // no SSRF filtering: local origins are valid targets
        assert!(parse_target_url("http://127.0.0.1:8080/index.m3u8").is_ok());
        assert!(parse_target_url("http://[::1]/index.m3u8").is_ok());
    }

    #[test]
    fn keeps_query_string_intact() {
        let url = parse_target_url("https://cdn.example/p.m3u8?a=1&b=x%2Fy").unwrap();
        assert_eq!(url.query(), Some("a=1&b=x%2Fy"));
    }

    #[test]
    fn rejects_relative_urls() {
        assert!(parse_target_url("segment001.ts").is_err());
        assert!(parse_target_url("/proxy?url=x").is_err());
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(parse_target_url("ftp://cdn.example/file.ts").is_err());
        assert!(parse_target_url("file:///etc/passwd").is_err());
        assert!(parse_target_url("data:text/plain,hi").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_target_url("").is_err());
        assert!(parse_target_url("://missing-scheme").is_err());
    }
}
