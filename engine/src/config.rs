//! Engine configuration.
//!
//! Configuration values are provided by the embedding application, not
//! hardcoded. Step routing itself is configured through the step policy; the
//! structures here cover operation lifecycle defaults and the SCA login
//! presentation template.

use chrono::Duration;

/// Operation lifecycle configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long an operation stays valid after creation.
    ///
    /// Default: 5 minutes
    pub operation_timeout: Duration,
}

impl EngineConfig {
    /// Create configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            operation_timeout: Duration::minutes(5),
        }
    }

    /// Set the operation timeout.
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Presentation template applied when the SCA login override is in effect.
///
/// The override reshapes only the *displayed* operation name, data and form
/// messages; the stored aggregate is never touched.
#[derive(Debug, Clone)]
pub struct ScaConfig {
    /// Operation name shown while the SCA login step runs.
    pub login_operation_name: String,

    /// Operation data template for the login presentation.
    pub login_operation_data: String,

    /// Title message key.
    pub login_title: String,

    /// Greeting message key.
    pub login_greeting: String,

    /// Summary message key.
    pub login_summary: String,
}

impl ScaConfig {
    /// Create the standard login presentation template.
    #[must_use]
    pub fn new() -> Self {
        Self {
            login_operation_name: "login".to_string(),
            login_operation_data: "A2".to_string(),
            login_title: "login.title".to_string(),
            login_greeting: "login.greeting".to_string(),
            login_summary: "login.summary".to_string(),
        }
    }

    /// Override the displayed operation name.
    #[must_use]
    pub fn with_operation_name(mut self, name: &str) -> Self {
        self.login_operation_name = name.to_string();
        self
    }

    /// Override the displayed operation data template.
    #[must_use]
    pub fn with_operation_data(mut self, data: &str) -> Self {
        self.login_operation_data = data.to_string();
        self
    }
}

impl Default for ScaConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_builder() {
        let config = EngineConfig::new().with_operation_timeout(Duration::minutes(10));
        assert_eq!(config.operation_timeout, Duration::minutes(10));
    }

    #[test]
    fn test_default_sca_template() {
        let config = ScaConfig::default();
        assert_eq!(config.login_operation_name, "login");
        assert_eq!(config.login_operation_data, "A2");
        assert_eq!(config.login_title, "login.title");
    }
}
