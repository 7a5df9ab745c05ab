use anyhow::Result;
use regex::{Captures, Regex};
use std::env;
use tracing::{debug, warn};

/// `${VAR}`, `${VAR:-fallback}` or `$VAR`
const PLACEHOLDER: &str = r"\$\{(\w+)(?::-([^}]*))?\}|\$(\w+)";

/// Substitute environment variables in the formats `${VAR}`,
/// `${VAR:-fallback}` and `$VAR`.
///
/// Unset variables without a fallback keep their placeholder; the YAML
/// parser or the validator reports them later.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(PLACEHOLDER)?;
    let mut missing_vars = Vec::new();

    let result = re.replace_all(content, |caps: &Captures| {
        let Some(var_name) = caps.get(1).or_else(|| caps.get(3)).map(|m| m.as_str()) else {
            return caps[0].to_string();
        };

        match env::var(var_name) {
            Ok(value) => {
                debug!("Substituting environment variable: {}", var_name);
                value
            }
            Err(_) => match caps.get(2) {
                Some(fallback) => fallback.as_str().to_string(),
                None => {
                    warn!("Environment variable '{}' not set", var_name);
                    missing_vars.push(var_name.to_string());
                    caps[0].to_string()
                }
            },
        }
    });

    if !missing_vars.is_empty() {
        debug!("Unresolved environment variables: {:?}", missing_vars);
    }

    Ok(result.into_owned())
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    Regex::new(PLACEHOLDER)
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}
