//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection configuration.
    pub database: DatabaseConfig,

    /// Dump behavior configuration.
    pub dump: DumpConfig,
}

/// MySQL connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database (schema) name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,
}

/// Dump behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Table the closure is seeded from.
    pub table: String,

    /// Optional raw WHERE-clause text for the starting table. When
    /// omitted the starting table is scanned in full.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#where: Option<String>,

    /// Bulk-insert verb written per table (default: REPLACE).
    #[serde(default = "default_insert_verb")]
    pub insert_verb: String,

    /// Maximum indexed values per column set before predicate
    /// synthesis gives up and falls back to in-memory row filtering
    /// (default: 20).
    #[serde(default = "default_max_values")]
    pub max_values_per_column_set: usize,

    /// Row-retention strictness for the in-memory fallback.
    #[serde(default)]
    pub match_mode: MatchMode,
}

/// How a row must relate to known key values to survive the in-memory
/// fallback scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Keep a row if any outgoing reference matches known values.
    #[default]
    Any,

    /// Keep a row only if every outgoing reference matches.
    All,
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(MatchMode::Any),
            "all" => Ok(MatchMode::All),
            other => Err(format!("unknown match mode '{}' (expected any|all)", other)),
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_insert_verb() -> String {
    "REPLACE".to_string()
}

fn default_max_values() -> usize {
    20
}
