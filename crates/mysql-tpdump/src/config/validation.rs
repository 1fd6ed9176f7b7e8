//! Configuration validation.

use crate::error::{DumpError, Result};

use super::types::Config;

pub fn validate(config: &Config) -> Result<()> {
    if config.database.database.is_empty() {
        return Err(DumpError::Config("database name must not be empty".into()));
    }
    if config.database.user.is_empty() {
        return Err(DumpError::Config("database user must not be empty".into()));
    }
    if config.dump.table.is_empty() {
        return Err(DumpError::Config("starting table must not be empty".into()));
    }
    if config.dump.insert_verb.trim().is_empty() {
        return Err(DumpError::Config("insert verb must not be empty".into()));
    }
    if config.dump.max_values_per_column_set == 0 {
        return Err(DumpError::Config(
            "max_values_per_column_set must be at least 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, DatabaseConfig, DumpConfig, MatchMode};

    fn valid_config() -> Config {
        Config {
            database: DatabaseConfig {
                host: "localhost".into(),
                port: 3306,
                database: "shop".into(),
                user: "dumper".into(),
                password: "secret".into(),
            },
            dump: DumpConfig {
                table: "orders".into(),
                r#where: None,
                insert_verb: "REPLACE".into(),
                max_values_per_column_set: 20,
                match_mode: MatchMode::Any,
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_table_rejected() {
        let mut config = valid_config();
        config.dump.table.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = valid_config();
        config.dump.max_values_per_column_set = 0;
        assert!(config.validate().is_err());
    }
}
