//! Persistent key/value configuration store.
//!
//! The store is a plain-text file of `NAME = value` lines. Values keep the
//! literal conventions the catalog collaborators expect: booleans as bare
//! `True`/`False`, strings quoted, exact decimals as `Decimal('…')` and
//! integers bare. The writer replaces only the value of the requested key
//! and leaves every other line byte-for-byte untouched, so hand edits and
//! comments survive programmatic updates.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{TkzError, TkzResult};

/// Recognized configuration keys.
pub mod keys {
    /// Filename of the embedded SQLite catalog.
    pub const SQLITE_DB_NAME: &str = "SQLITE_DB_NAME";
    /// Which backend to bind: `'MySQL'`, `'SQLite'` or `False`.
    pub const DB_EXISTING_CONNECTION: &str = "DB_EXISTING_CONNECTION";
    /// Drop-and-rebuild tables on install.
    pub const DB_TABLES_CLEAR_INSTALL: &str = "DB_TABLES_CLEAR_INSTALL";
    /// Echo SQL statements for debugging.
    pub const ENGINE_ECHO: &str = "ENGINE_ECHO";
    /// Display mode for consumers; does not change the physics.
    pub const SYSTEM_PHASES: &str = "SYSTEM_PHASES";
    /// Voltage U used in the short-circuit formulas.
    pub const SYSTEM_VOLTAGE_IN_KILOVOLTS: &str = "SYSTEM_VOLTAGE_IN_KILOVOLTS";
    /// Decimal places in rounded results.
    pub const CALCULATIONS_ACCURACY: &str = "CALCULATIONS_ACCURACY";
}

/// A typed configuration value with a literal text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
}

impl ConfigValue {
    /// Parse the literal text form of a value.
    pub fn parse(raw: &str) -> ConfigValue {
        let raw = raw.trim();
        if raw == "True" {
            return ConfigValue::Bool(true);
        }
        if raw == "False" {
            return ConfigValue::Bool(false);
        }
        if let Some(inner) = raw
            .strip_prefix("Decimal('")
            .and_then(|rest| rest.strip_suffix("')"))
        {
            if let Ok(dec) = inner.parse::<Decimal>() {
                return ConfigValue::Decimal(dec);
            }
        }
        if let Ok(int) = raw.parse::<i64>() {
            return ConfigValue::Int(int);
        }
        for quote in ['\'', '"'] {
            if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
                return ConfigValue::Text(raw[1..raw.len() - 1].to_string());
            }
        }
        ConfigValue::Text(raw.to_string())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ConfigValue::Decimal(value) => Some(*value),
            ConfigValue::Int(value) => Some(Decimal::from(*value)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(true) => write!(f, "True"),
            ConfigValue::Bool(false) => write!(f, "False"),
            ConfigValue::Int(value) => write!(f, "{value}"),
            ConfigValue::Decimal(value) => write!(f, "Decimal('{value}')"),
            // Already-quoted text gets the alternate quote, as the catalog
            // collaborators expect.
            ConfigValue::Text(value) if value.contains('\'') => write!(f, "\"{value}\""),
            ConfigValue::Text(value) => write!(f, "'{value}'"),
        }
    }
}

/// Which catalog backend the configuration binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendBinding {
    MySql,
    Sqlite,
    /// `DB_EXISTING_CONNECTION = False`: nothing bound yet.
    Unset,
}

/// Handle to the configuration file.
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
}

impl Config {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Config { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the configuration file; the SQLite catalog and the
    /// credentials file live next to it.
    pub fn root_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn read_all(&self) -> TkzResult<String> {
        fs::read_to_string(&self.path).map_err(|err| {
            TkzError::Config(format!(
                "cannot read config file {}: {err}",
                self.path.display()
            ))
        })
    }

    /// Read the value of `key`, or `None` when the key is absent.
    pub fn get(&self, key: &str) -> TkzResult<Option<ConfigValue>> {
        let data = self.read_all()?;
        for line in data.lines() {
            if let Some((name, value)) = line.split_once(" = ") {
                if name == key {
                    return Ok(Some(ConfigValue::parse(value)));
                }
            }
        }
        Ok(None)
    }

    /// Write a new value for `key`, preserving every other line untouched.
    ///
    /// Returns `false` (without writing) when the key is not present; keys
    /// enter the file only through its initial deployment.
    pub fn set(&self, key: &str, value: &ConfigValue) -> TkzResult<bool> {
        let data = self.read_all()?;
        let mut replaced = false;
        let mut updated = String::with_capacity(data.len());
        for piece in data.split_inclusive('\n') {
            let (line, terminator) = match piece.strip_suffix("\r\n") {
                Some(line) => (line, "\r\n"),
                None => match piece.strip_suffix('\n') {
                    Some(line) => (line, "\n"),
                    None => (piece, ""),
                },
            };
            match line.split_once(" = ") {
                Some((name, _)) if !replaced && name == key => {
                    updated.push_str(&format!("{key} = {value}{terminator}"));
                    replaced = true;
                }
                _ => updated.push_str(piece),
            }
        }
        if !replaced {
            warn!("config key {key} not present in {}", self.path.display());
            return Ok(false);
        }
        fs::write(&self.path, updated).map_err(|err| {
            TkzError::Config(format!(
                "cannot write config file {}: {err}",
                self.path.display()
            ))
        })?;
        tracing::info!("config changed: now {key} = {value}");
        Ok(true)
    }

    fn require(&self, key: &str) -> TkzResult<ConfigValue> {
        self.get(key)?
            .ok_or_else(|| TkzError::Config(format!("config key {key} is missing")))
    }

    pub fn system_voltage(&self) -> TkzResult<Decimal> {
        self.require(keys::SYSTEM_VOLTAGE_IN_KILOVOLTS)?
            .as_decimal()
            .ok_or_else(|| decimal_expected(keys::SYSTEM_VOLTAGE_IN_KILOVOLTS))
    }

    pub fn accuracy(&self) -> TkzResult<u32> {
        let value = self
            .require(keys::CALCULATIONS_ACCURACY)?
            .as_int()
            .ok_or_else(|| int_expected(keys::CALCULATIONS_ACCURACY))?;
        u32::try_from(value).map_err(|_| int_expected(keys::CALCULATIONS_ACCURACY))
    }

    pub fn sqlite_db_name(&self) -> TkzResult<String> {
        Ok(self
            .require(keys::SQLITE_DB_NAME)?
            .as_text()
            .ok_or_else(|| text_expected(keys::SQLITE_DB_NAME))?
            .to_string())
    }

    pub fn backend_binding(&self) -> TkzResult<BackendBinding> {
        match self.require(keys::DB_EXISTING_CONNECTION)? {
            ConfigValue::Bool(false) => Ok(BackendBinding::Unset),
            ConfigValue::Text(name) if name == "MySQL" => Ok(BackendBinding::MySql),
            ConfigValue::Text(name) if name == "SQLite" => Ok(BackendBinding::Sqlite),
            other => Err(TkzError::Config(format!(
                "unsupported {} value: {other}",
                keys::DB_EXISTING_CONNECTION
            ))),
        }
    }

    /// Record the backend the engine actually bound.
    pub fn bind_backend(&self, binding: BackendBinding) -> TkzResult<()> {
        let literal = match binding {
            BackendBinding::MySql => ConfigValue::Text("MySQL".into()),
            BackendBinding::Sqlite => ConfigValue::Text("SQLite".into()),
            BackendBinding::Unset => ConfigValue::Bool(false),
        };
        self.set(keys::DB_EXISTING_CONNECTION, &literal)?;
        Ok(())
    }

    pub fn tables_clear_install(&self) -> TkzResult<bool> {
        self.require(keys::DB_TABLES_CLEAR_INSTALL)?
            .as_bool()
            .ok_or_else(|| bool_expected(keys::DB_TABLES_CLEAR_INSTALL))
    }

    pub fn engine_echo(&self) -> TkzResult<bool> {
        self.require(keys::ENGINE_ECHO)?
            .as_bool()
            .ok_or_else(|| bool_expected(keys::ENGINE_ECHO))
    }

    pub fn system_phases(&self) -> TkzResult<i64> {
        self.require(keys::SYSTEM_PHASES)?
            .as_int()
            .ok_or_else(|| int_expected(keys::SYSTEM_PHASES))
    }
}

fn decimal_expected(key: &str) -> TkzError {
    TkzError::Config(format!("config key {key} must be a Decimal literal"))
}

fn int_expected(key: &str) -> TkzError {
    TkzError::Config(format!("config key {key} must be an integer"))
}

fn bool_expected(key: &str) -> TkzError {
    TkzError::Config(format!("config key {key} must be True or False"))
}

fn text_expected(key: &str) -> TkzError {
    TkzError::Config(format!("config key {key} must be a quoted string"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn fixture(contents: &str) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tkz.conf");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, Config::new(path))
    }

    const SAMPLE: &str = "\
SQLITE_DB_NAME = 'electrical_product_catalog.db'
DB_EXISTING_CONNECTION = 'SQLite'
DB_TABLES_CLEAR_INSTALL = False
ENGINE_ECHO = False
SYSTEM_PHASES = 3
SYSTEM_VOLTAGE_IN_KILOVOLTS = Decimal('0.4')
CALCULATIONS_ACCURACY = 3
";

    #[test]
    fn literals_round_trip() {
        for raw in ["True", "False", "42", "Decimal('0.4')", "'MySQL'"] {
            assert_eq!(ConfigValue::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn typed_getters() {
        let (_dir, config) = fixture(SAMPLE);
        assert_eq!(config.system_voltage().unwrap(), dec!(0.4));
        assert_eq!(config.accuracy().unwrap(), 3);
        assert_eq!(
            config.sqlite_db_name().unwrap(),
            "electrical_product_catalog.db"
        );
        assert_eq!(config.backend_binding().unwrap(), BackendBinding::Sqlite);
        assert!(!config.tables_clear_install().unwrap());
        assert!(!config.engine_echo().unwrap());
        assert_eq!(config.system_phases().unwrap(), 3);
    }

    #[test]
    fn missing_key_reads_as_none() {
        let (_dir, config) = fixture(SAMPLE);
        assert!(config.get("NO_SUCH_KEY").unwrap().is_none());
    }

    #[test]
    fn set_rewrites_only_the_target_line() {
        let (_dir, config) = fixture(SAMPLE);
        let written = config
            .set(keys::CALCULATIONS_ACCURACY, &ConfigValue::Int(5))
            .unwrap();
        assert!(written);
        let data = fs::read_to_string(config.path()).unwrap();
        assert_eq!(
            data,
            SAMPLE.replace("CALCULATIONS_ACCURACY = 3", "CALCULATIONS_ACCURACY = 5")
        );
        assert_eq!(config.accuracy().unwrap(), 5);
    }

    #[test]
    fn set_on_missing_key_is_a_no_op() {
        let (_dir, config) = fixture(SAMPLE);
        let written = config.set("NO_SUCH_KEY", &ConfigValue::Int(1)).unwrap();
        assert!(!written);
        assert_eq!(fs::read_to_string(config.path()).unwrap(), SAMPLE);
    }

    #[test]
    fn backend_binding_false_means_unset() {
        let (_dir, config) = fixture(&SAMPLE.replace("'SQLite'", "False"));
        assert_eq!(config.backend_binding().unwrap(), BackendBinding::Unset);
    }
}
