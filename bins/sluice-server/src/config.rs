use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use sluice_api_server::ApiConfig;
use sluice_elastic::ElasticConfig;
use sluice_memory::MemoryConfig;
use sluice_pipeline::IngestConfig;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "sluice-server", about = "Bulk CSV ingestion into a search index")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Ingest one local CSV file and exit
    Ingest(IngestArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// API port (overrides `api.port`)
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}

#[derive(Args, Clone, Debug)]
pub struct IngestArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// CSV file with a header row
    pub file: PathBuf,

    /// Target index (overrides `ingest.index`)
    #[arg(long)]
    pub index: Option<String>,

    /// Records per bulk request (overrides `ingest.batch_size`)
    #[arg(long)]
    pub batch_size: Option<usize>,
}

#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    /// Path to the TOML config file; built-in defaults when omitted
    #[arg(long, env = "SLUICE_CONFIG")]
    pub config: Option<String>,

    #[arg(long, env = "ELASTICSEARCH_URL")]
    pub elasticsearch_url: Option<String>,

    #[arg(long, env = "ELASTICSEARCH_USERNAME")]
    pub elasticsearch_username: Option<String>,

    #[arg(long, env = "ELASTICSEARCH_PASSWORD", hide_env_values = true)]
    pub elasticsearch_password: Option<String>,
}

// ---- TOML Config ----

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Elastic,
    Memory,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub elastic: ElasticConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl ServerConfig {
    /// Read the file named by `--config` / `SLUICE_CONFIG` (defaults when
    /// absent), then apply the connection overrides from the environment.
    pub fn load(args: &CommonArgs) -> Result<Self, ServerError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(args);
        config
            .ingest
            .validate()
            .map_err(|e| ServerError::Config { context: "validate", detail: e.to_string() })?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply(&mut self, args: &CommonArgs) {
        if let Some(url) = &args.elasticsearch_url {
            self.elastic.url = url.clone();
        }
        if let Some(username) = &args.elasticsearch_username {
            self.elastic.username = username.clone();
        }
        if let Some(password) = &args.elasticsearch_password {
            self.elastic.password = password.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn no_overrides() -> CommonArgs {
        CommonArgs {
            config: None,
            elasticsearch_url: None,
            elasticsearch_username: None,
            elasticsearch_password: None,
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = ServerConfig::parse("").unwrap();
        assert_eq!(config.backend, BackendKind::Elastic);
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.ingest.index, "campaigns");
        assert_eq!(config.ingest.batch_size, 1000);
        assert_eq!(config.elastic.url, "http://localhost:9200");
        assert_eq!(config.memory.page_size, 10);
    }

    #[test]
    fn sections_parse() {
        let config = ServerConfig::parse(
            r#"
            backend = "memory"

            [api]
            port = 8080
            upload_dir = "/tmp/sluice"

            [ingest]
            index = "ads"
            batch_size = 500

            [elastic]
            url = "https://es.internal:9200"
            keyword_suffix = ""
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.upload_dir, PathBuf::from("/tmp/sluice"));
        assert_eq!(config.ingest.index, "ads");
        assert_eq!(config.ingest.batch_size, 500);
        assert_eq!(config.elastic.url, "https://es.internal:9200");
        assert_eq!(config.elastic.keyword_suffix, "");
    }

    #[test]
    fn example_config_parses() {
        let config = ServerConfig::parse(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config.backend, BackendKind::Elastic);
        assert_eq!(config.elastic.password, "changeme");
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        assert!(ServerConfig::parse("backend = \"solr\"").is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[elastic]\nurl = \"http://from-file:9200\"\nusername = \"file-user\"").unwrap();

        let args = CommonArgs {
            config: Some(file.path().display().to_string()),
            elasticsearch_url: Some("http://from-env:9200".into()),
            elasticsearch_password: Some("s3cret".into()),
            ..no_overrides()
        };
        let config = ServerConfig::load(&args).unwrap();
        assert_eq!(config.elastic.url, "http://from-env:9200");
        assert_eq!(config.elastic.username, "file-user");
        assert_eq!(config.elastic.password, "s3cret");
    }

    #[test]
    fn invalid_ingest_settings_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ingest]\nbatch_size = 0").unwrap();

        let args = CommonArgs { config: Some(file.path().display().to_string()), ..no_overrides() };
        assert!(matches!(
            ServerConfig::load(&args),
            Err(ServerError::Config { context: "validate", .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let args = CommonArgs { config: Some("/nonexistent/sluice.toml".into()), ..no_overrides() };
        assert!(matches!(ServerConfig::load(&args), Err(ServerError::Config { context: "read", .. })));
    }
}
