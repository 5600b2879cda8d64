//! Environment selection.

use axum::http::StatusCode;

use crate::abort::Abort;

/// Matches every environment.
pub const ALL_ENVIRONMENTS: &str = "*";

/// Accept `env` if it is `*` or one of the known environments.
pub fn check_env<S: AsRef<str>>(env: &str, envs: &[S]) -> Result<(), Abort> {
    if env == ALL_ENVIRONMENTS || envs.iter().any(|e| e.as_ref() == env) {
        Ok(())
    } else {
        Err(Abort(StatusCode::NOT_FOUND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_is_always_accepted() {
        assert_eq!(check_env("*", &["prod"]), Ok(()));
        assert_eq!(check_env::<&str>("*", &[]), Ok(()));
    }

    #[test]
    fn known_environment_is_accepted() {
        assert_eq!(check_env("prod", &["prod", "dev"]), Ok(()));
        let owned = vec!["prod".to_string(), "dev".to_string()];
        assert_eq!(check_env("dev", &owned), Ok(()));
    }

    #[test]
    fn unknown_environment_aborts_404() {
        assert_eq!(
            check_env("qa", &["prod", "dev"]),
            Err(Abort(StatusCode::NOT_FOUND))
        );
        assert_eq!(check_env("Prod", &["prod"]), Err(Abort(StatusCode::NOT_FOUND)));
    }
}
