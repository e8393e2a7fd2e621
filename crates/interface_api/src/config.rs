//! API configuration
//!
//! Settings come from `API_`-prefixed environment variables (a `.env` file is
//! loaded first by the binary). The workflow step list lives in a separate
//! TOML file named by `workflow_file`.

use serde::Deserialize;

use domain_workflow::{WorkflowStep, WorkflowStepRegistry};

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Path of the workflow step definitions
    pub workflow_file: String,
    /// Role permitted to allocate requests to reviewers
    pub allocator_role: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/sanction".to_string(),
            log_level: "info".to_string(),
            workflow_file: "config/workflow.toml".to_string(),
            allocator_role: "CUSTOMER_ADMIN".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment, falling back to defaults per key
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_expiration_secs", defaults.jwt_expiration_secs as i64)?
            .set_default("database_url", defaults.database_url)?
            .set_default("log_level", defaults.log_level)?
            .set_default("workflow_file", defaults.workflow_file)?
            .set_default("allocator_role", defaults.allocator_role)?
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowFile {
    steps: Vec<WorkflowStep>,
}

/// Loads and validates the step registry from a TOML file
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed, or if the
/// steps violate the registry invariants (empty, zero or duplicate orders,
/// blank names or roles).
pub fn load_workflow_registry(path: &str) -> Result<WorkflowStepRegistry, config::ConfigError> {
    let source = config::File::new(path, config::FileFormat::Toml);
    parse_workflow(source)
}

/// Parses step definitions from an in-memory TOML document
pub fn workflow_registry_from_str(toml: &str) -> Result<WorkflowStepRegistry, config::ConfigError> {
    parse_workflow(config::File::from_str(toml, config::FileFormat::Toml))
}

fn parse_workflow<S>(source: S) -> Result<WorkflowStepRegistry, config::ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let file: WorkflowFile = config::Config::builder()
        .add_source(source)
        .build()?
        .try_deserialize()?;

    WorkflowStepRegistry::new(file.steps).map_err(|e| config::ConfigError::Message(e.to_string()))
}
