//! Shared HTTP plumbing: mapping statuses and transport failures onto
//! the `SourceError` taxonomy.

use crate::error::SourceError;
use reqwest::StatusCode;
use tracks::Platform;

/// Turn a non-success status into the matching error class.
pub(crate) fn check_status(platform: Platform, status: StatusCode) -> Result<(), SourceError> {
    if status.is_success() {
        return Ok(());
    }

    let err = match status {
        StatusCode::UNAUTHORIZED => {
            SourceError::authentication(platform, "token is invalid or expired (401 Unauthorized)")
        }
        StatusCode::FORBIDDEN => {
            SourceError::authentication(platform, "token lacks required permissions (403 Forbidden)")
        }
        StatusCode::TOO_MANY_REQUESTS => {
            SourceError::transient(platform, "rate limit exceeded (429 Too Many Requests)")
        }
        StatusCode::REQUEST_TIMEOUT => SourceError::transient(platform, "request timed out (408)"),
        s if s.is_server_error() => SourceError::transient(platform, format!("server error ({})", s)),
        s => SourceError::invalid_response(platform, format!("unexpected status {}", s)),
    };
    Err(err)
}

/// Classify a reqwest failure.
pub(crate) fn transport_error(platform: Platform, err: reqwest::Error) -> SourceError {
    if err.is_decode() {
        SourceError::invalid_response(platform, format!("could not decode body: {}", err))
    } else if err.is_timeout() {
        SourceError::transient(platform, format!("request timed out: {}", err))
    } else if err.is_connect() {
        SourceError::transient(platform, format!("connection failed: {}", err))
    } else {
        SourceError::transient(platform, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let p = Platform::SoundCloud;

        assert!(check_status(p, StatusCode::OK).is_ok());
        assert!(check_status(p, StatusCode::UNAUTHORIZED).unwrap_err().is_authentication());
        assert!(check_status(p, StatusCode::FORBIDDEN).unwrap_err().is_authentication());
        assert!(check_status(p, StatusCode::TOO_MANY_REQUESTS).unwrap_err().is_transient());
        assert!(check_status(p, StatusCode::BAD_GATEWAY).unwrap_err().is_transient());

        let err = check_status(p, StatusCode::NOT_FOUND).unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse { .. }));
    }
}
