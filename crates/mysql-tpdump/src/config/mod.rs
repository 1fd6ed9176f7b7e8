//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::error::Result;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_defaults() {
        let config = Config::from_yaml(
            r#"
database:
  database: shop
  user: dumper
dump:
  table: orders
"#,
        )
        .unwrap();

        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.dump.insert_verb, "REPLACE");
        assert_eq!(config.dump.max_values_per_column_set, 20);
        assert_eq!(config.dump.match_mode, MatchMode::Any);
        assert!(config.dump.r#where.is_none());
    }

    #[test]
    fn test_from_yaml_missing_table_fails() {
        let err = Config::from_yaml(
            r#"
database:
  database: shop
  user: dumper
dump:
  table: ""
"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "database:\n  database: shop\n  user: dumper\ndump:\n  table: orders\n"
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.dump.table, "orders");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("does_not_exist.yaml").unwrap_err();
        assert!(matches!(err, crate::error::DumpError::Io(_)));
    }

    #[test]
    fn test_match_mode_parse() {
        assert_eq!("all".parse::<MatchMode>().unwrap(), MatchMode::All);
        assert_eq!("ANY".parse::<MatchMode>().unwrap(), MatchMode::Any);
        assert!("some".parse::<MatchMode>().is_err());
    }
}
