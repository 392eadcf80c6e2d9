use super::errors::ConformanceError;

/// Checks that every expected scope was granted.
///
/// Granted scopes beyond the expected ones are accepted.
pub fn verify_scopes(expected: &[String], actual: &[String]) -> Result<(), ConformanceError> {
    let mut missing: Vec<String> = Vec::new();
    for scope in expected {
        if !actual.contains(scope) && !missing.contains(scope) {
            missing.push(scope.clone());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        tracing::warn!(
            "Scope mismatch: expected {:?}, got {:?}, missing {:?}",
            expected,
            actual,
            missing
        );
        Err(ConformanceError::ScopeMismatch { missing })
    }
}
