//! Loopback URI derivation

use crate::error::UriError;

/// Replace the scheme of `uri` with `protocol`
///
/// `rtmp://host/app/inst` with `rtmfp` becomes `rtmfp://host/app/inst`. Only the
/// scheme changes; authority, path and query are kept byte for byte.
pub fn rewrite_protocol(uri: &str, protocol: &str) -> Result<String, UriError> {
    if protocol.is_empty() {
        return Err(UriError::EmptyProtocol);
    }

    let (scheme, rest) = uri
        .split_once(':')
        .filter(|(scheme, _)| is_scheme(scheme))
        .ok_or_else(|| UriError::MissingScheme(uri.to_string()))?;

    tracing::trace!(from = scheme, to = protocol, "Rewriting URI scheme");

    Ok(format!("{}:{}", protocol, rest))
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_rtmp() {
        assert_eq!(
            rewrite_protocol("rtmp://localhost/multicast/_definst_", "rtmfp").unwrap(),
            "rtmfp://localhost/multicast/_definst_"
        );
    }

    #[test]
    fn test_rewrite_keeps_port_and_query() {
        assert_eq!(
            rewrite_protocol("rtmpt://10.0.0.1:80/app?x=1", "rtmfp").unwrap(),
            "rtmfp://10.0.0.1:80/app?x=1"
        );
    }

    #[test]
    fn test_rewrite_same_protocol() {
        assert_eq!(
            rewrite_protocol("rtmfp://host/app", "rtmfp").unwrap(),
            "rtmfp://host/app"
        );
    }

    #[test]
    fn test_rewrite_missing_scheme() {
        assert!(matches!(
            rewrite_protocol("localhost/app", "rtmfp"),
            Err(UriError::MissingScheme(_))
        ));
        assert!(matches!(
            rewrite_protocol("://host/app", "rtmfp"),
            Err(UriError::MissingScheme(_))
        ));
    }

    #[test]
    fn test_rewrite_empty_protocol() {
        assert_eq!(
            rewrite_protocol("rtmp://host/app", ""),
            Err(UriError::EmptyProtocol)
        );
    }
}
