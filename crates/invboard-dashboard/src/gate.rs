//! Startup check of the backend version.
//!
//! Backend releases before 5.2.13, 5.3.13 and 6.9.1 in their respective
//! lines lack the v2 metrics API the dashboard reads from.

use semver::Version;
use thiserror::Error;
use tracing::{error, info};

use invboard_client::{Backend, BackendError};

/// Process exit code for an incompatible backend version.
pub const EXIT_INCOMPATIBLE: i32 = 1;
/// Process exit code when the backend version could not be determined.
pub const EXIT_UNKNOWN_VERSION: i32 = 2;

struct ExcludedRange {
    from: Version,
    until: Version,
    reason: &'static str,
}

/// Half-open `[from, until)` ranges, checked in order.
const EXCLUDED: [ExcludedRange; 3] = [
    ExcludedRange {
        from: Version::new(5, 2, 0),
        until: Version::new(5, 2, 13),
        reason: "for 5.2.x version >= 5.2.13 is required (with v2 metrics API)",
    },
    ExcludedRange {
        from: Version::new(5, 3, 0),
        until: Version::new(5, 3, 13),
        reason: "for 5.3.x version >= 5.3.13 is required (with v2 metrics API)",
    },
    ExcludedRange {
        from: Version::new(6, 0, 0),
        until: Version::new(6, 9, 1),
        reason: "for 6.x version >= 6.9.1 is required (with v2 metrics API)",
    },
];

const MINIMUM: Version = Version::new(5, 2, 13);
const BELOW_MINIMUM: &str = "the minimum supported version is 5.2.13 (with v2 metrics API)";

#[derive(Debug, Error)]
pub enum VersionGateError {
    #[error("backend version {version} is not supported: {reason}")]
    Incompatible {
        version: Version,
        reason: &'static str,
    },

    #[error("could not determine backend version: {0}")]
    Unavailable(#[from] BackendError),

    #[error("could not parse backend version {raw:?}: {source}")]
    Unparsable { raw: String, source: semver::Error },
}

impl VersionGateError {
    /// Exit code the process terminates with.
    pub fn exit_code(&self) -> i32 {
        match self {
            VersionGateError::Incompatible { .. } => EXIT_INCOMPATIBLE,
            VersionGateError::Unavailable(_) | VersionGateError::Unparsable { .. } => {
                EXIT_UNKNOWN_VERSION
            }
        }
    }
}

/// Parse a dotted version, padding `"6"` or `"6.9"` to three components.
pub fn parse_version(raw: &str) -> Result<Version, semver::Error> {
    let raw = raw.trim();
    match Version::parse(raw) {
        Ok(v) => Ok(v),
        Err(e) => {
            let parts = raw.split('.').count();
            let numeric = raw.split('.').all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
            if numeric && parts < 3 {
                let padded = format!("{raw}{}", ".0".repeat(3 - parts));
                Version::parse(&padded)
            } else {
                Err(e)
            }
        }
    }
}

/// Check a parsed version against the excluded ranges and the floor.
pub fn check_version(version: &Version) -> Result<(), VersionGateError> {
    let reason = EXCLUDED
        .iter()
        .find(|r| r.from <= *version && *version < r.until)
        .map(|r| r.reason)
        .or((*version < MINIMUM).then_some(BELOW_MINIMUM));

    match reason {
        Some(reason) => Err(VersionGateError::Incompatible {
            version: version.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Fetch the backend version once and verify it is supported.
pub async fn check_db_version<B: Backend>(backend: &B) -> Result<Version, VersionGateError> {
    let result = async {
        let raw = backend.current_version().await?;
        let version = parse_version(&raw)
            .map_err(|source| VersionGateError::Unparsable { raw, source })?;
        check_version(&version)?;
        Ok::<_, VersionGateError>(version)
    }
    .await;

    match &result {
        Ok(version) => info!(%version, "backend version accepted"),
        Err(e) => error!(error = %e, exit_code = e.exit_code(), "backend version check failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use invboard_client::{BackendResult, Page};
    use rstest::rstest;
    use serde_json::Value;

    struct Reports(Result<&'static str, fn() -> BackendError>);

    impl Backend for Reports {
        async fn current_version(&self) -> BackendResult<String> {
            self.0.map(str::to_string).map_err(|f| f())
        }

        async fn environments(&self) -> BackendResult<Vec<String>> {
            Ok(vec![])
        }

        async fn query(&self, _query: &str, _page: Option<Page>) -> BackendResult<Vec<Value>> {
            Ok(vec![])
        }
    }

    #[rstest]
    #[case("5.2.5", Some(1))]
    #[case("5.2.0", Some(1))]
    #[case("5.2.12", Some(1))]
    #[case("5.2.13", None)]
    #[case("5.3.5", Some(1))]
    #[case("5.3.13", None)]
    #[case("5.1.0", Some(1))]
    #[case("4.4.0", Some(1))]
    #[case("6.0.0", Some(1))]
    #[case("6.9.0", Some(1))]
    #[case("6.9.1", None)]
    #[case("6.10.0", None)]
    #[case("7.13.0", None)]
    #[case("5.4.0", None)]
    #[tokio::test]
    async fn version_table(#[case] version: &'static str, #[case] exit: Option<i32>) {
        let result = check_db_version(&Reports(Ok(version))).await;
        assert_eq!(result.as_ref().err().map(|e| e.exit_code()), exit, "{version}");
        if exit.is_none() {
            assert_eq!(result.unwrap(), parse_version(version).unwrap());
        }
    }

    #[test]
    fn semver_ordering_is_numeric_not_lexical() {
        // "6.10.0" < "6.9.1" lexically.
        assert!(check_version(&Version::new(6, 10, 0)).is_ok());
    }

    #[test]
    fn rejection_names_the_matching_range() {
        let err = check_version(&Version::new(5, 3, 1)).unwrap_err();
        assert!(err.to_string().contains("5.3.13"), "{err}");

        let err = check_version(&Version::new(5, 1, 0)).unwrap_err();
        assert!(err.to_string().contains("minimum supported version"), "{err}");
    }

    #[test]
    fn short_versions_are_padded() {
        assert_eq!(parse_version("6.9").unwrap(), Version::new(6, 9, 0));
        assert_eq!(parse_version("7").unwrap(), Version::new(7, 0, 0));
        assert!(parse_version("six").is_err());
        assert!(parse_version("6..1").is_err());
    }

    #[tokio::test]
    async fn unreachable_backend_exits_2() {
        let err = check_db_version(&Reports(Err(|| BackendError::Connection("refused".into()))))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), EXIT_UNKNOWN_VERSION);
    }

    #[tokio::test]
    async fn empty_and_http_failures_exit_2() {
        let empty = Reports(Err(|| BackendError::EmptyResponse("".into())));
        assert_eq!(check_db_version(&empty).await.unwrap_err().exit_code(), 2);

        let http = Reports(Err(|| BackendError::Http {
            status: axum::http::StatusCode::SERVICE_UNAVAILABLE,
            url: "http://pdb/pdb/meta/v1/version".into(),
        }));
        assert_eq!(check_db_version(&http).await.unwrap_err().exit_code(), 2);
    }

    #[tokio::test]
    async fn garbage_version_exits_2() {
        let err = check_db_version(&Reports(Ok("not-a-version"))).await.unwrap_err();
        assert!(matches!(err, VersionGateError::Unparsable { .. }));
        assert_eq!(err.exit_code(), EXIT_UNKNOWN_VERSION);
    }
}
