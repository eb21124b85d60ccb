//! funk.toml configuration parser.
//!
//! Every key is optional; command-line flags take precedence.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunkConfig {
    pub query: Option<QueryConfig>,
    pub submission: Option<SubmissionConfig>,
    pub inventory: Option<InventoryConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    pub mode: Option<String>,
    pub resources: Option<String>,
    pub walltime: Option<String>,
    pub horizon: Option<String>,
    pub charter: Option<bool>,
    pub blacklist: Option<Vec<String>>,
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionConfig {
    pub job_name: Option<String>,
    pub options: Option<String>,
    pub program: Option<String>,
    pub kavlan: Option<bool>,
    pub subnet: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub path: Option<PathBuf>,
}

impl FunkConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FunkConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a funk.toml with the tool's defaults spelled out.
    pub fn scaffold() -> Self {
        FunkConfig {
            query: Some(QueryConfig {
                mode: Some("date".to_string()),
                resources: Some("grid5000".to_string()),
                walltime: Some("1:00:00".to_string()),
                horizon: Some("3w".to_string()),
                charter: Some(false),
                blacklist: None,
                ratio: None,
            }),
            submission: Some(SubmissionConfig {
                job_name: Some("FUNK".to_string()),
                options: None,
                program: None,
                kavlan: Some(false),
                subnet: None,
            }),
            inventory: Some(InventoryConfig {
                path: Some(PathBuf::from("inventory.json")),
            }),
        }
    }

    pub fn query(&self) -> QueryConfig {
        self.query.clone().unwrap_or_default()
    }

    pub fn submission(&self) -> SubmissionConfig {
        self.submission.clone().unwrap_or_default()
    }

    pub fn inventory_path(&self) -> Option<&Path> {
        self.inventory.as_ref()?.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold() {
        let config = FunkConfig::scaffold();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("grid5000"));
        assert!(toml_str.contains("FUNK"));
    }

    #[test]
    fn test_parse_minimal() {
        let toml_str = r#"
[query]
mode = "free"
resources = "grid5000:100,taurus:4"
blacklist = ["sagittaire"]
"#;
        let config: FunkConfig = toml::from_str(toml_str).unwrap();
        let query = config.query();
        assert_eq!(query.mode.as_deref(), Some("free"));
        assert_eq!(query.blacklist.unwrap(), vec!["sagittaire".to_string()]);
        assert!(config.submission().job_name.is_none());
        assert!(config.inventory_path().is_none());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("funk.toml");
        std::fs::write(&path, "[inventory]\npath = \"feed.json\"\n").unwrap();
        let config = FunkConfig::from_file(&path).unwrap();
        assert_eq!(config.inventory_path(), Some(Path::new("feed.json")));
    }
}
