use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Thin wrapper around `std::env::var` that provides a specific error type
/// for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    std::env::var(name).map_err(|_| MissingEnvVarError(name.to_string()))
}

/// Reads an environment variable, falling back to `default` when it is unset
/// or empty.
///
/// Used for optional overrides (endpoint base URLs, data directories) where
/// a missing variable is not an error.
pub fn env_var_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_var_is_a_structured_error() {
        let err = get_env_var("SHARED_UTILS_TEST_DEFINITELY_UNSET").unwrap_err();
        assert!(err.to_string().contains("SHARED_UTILS_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn fallback_applies_when_unset_or_empty() {
        assert_eq!(
            env_var_or("SHARED_UTILS_TEST_DEFINITELY_UNSET", "fallback"),
            "fallback"
        );
    }
}
