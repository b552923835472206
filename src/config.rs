use std::{env, path::PathBuf};

use legacy_migrations::{Error, LATEST_VERSION, SchemaVersion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub target_version: SchemaVersion,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        const DEFAULT_DATABASE_PATH: &str = "filelist.db";

        let database_path = lookup("DATABASE_PATH")
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.into())
            .into();

        let target_version = match lookup("TARGET_SCHEMA_VERSION") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "TARGET_SCHEMA_VERSION must be a non-negative integer, got '{raw}'"
                ))
            })?,
            None => LATEST_VERSION,
        };

        Ok(Self {
            database_path,
            target_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_latest_version() {
        let config = config(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("filelist.db"));
        assert_eq!(config.target_version, LATEST_VERSION);
    }

    #[test]
    fn reads_path_and_target() {
        let config = config(&[
            ("DATABASE_PATH", "/tmp/files.db"),
            ("TARGET_SCHEMA_VERSION", " 40 "),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/files.db"));
        assert_eq!(config.target_version, 40);
    }

    #[test]
    fn rejects_invalid_target() {
        assert!(matches!(
            config(&[("TARGET_SCHEMA_VERSION", "-1")]),
            Err(Error::Config(_))
        ));
    }
}
