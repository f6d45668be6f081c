//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive (configparser lowercases them).

use crate::domain::error::TradedeskError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TradedeskError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| TradedeskError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, TradedeskError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| TradedeskError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .filter(|v| !v.trim().is_empty())
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[backtest]
initial_capital = 25000.0
commission = 0.002
risk_free_rate = 0.03

[execution]
mode = sandbox
data_dir = /var/lib/tradedesk
store = sqlite
default_price = 42000

[okx]
api_key = abc
secret_key =
passphrase = p4ss
"#;

    #[test]
    fn from_string_parses_all_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("backtest", "initial_capital", 0.0), 25_000.0);
        assert_eq!(adapter.get_double("backtest", "commission", 0.0), 0.002);
        assert_eq!(adapter.get_string("execution", "mode"), Some("sandbox".into()));
        assert_eq!(
            adapter.get_string("execution", "data_dir"),
            Some("/var/lib/tradedesk".into())
        );
        assert_eq!(adapter.get_double("execution", "default_price", 0.0), 42_000.0);
        assert_eq!(adapter.get_string("okx", "api_key"), Some("abc".into()));
    }

    #[test]
    fn blank_value_reads_as_missing() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("okx", "secret_key"), None);
    }

    #[test]
    fn missing_keys_and_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("okx", "base_url"), None);
        assert_eq!(adapter.get_string("nope", "key"), None);
        assert_eq!(adapter.get_double("backtest", "missing", 99.9), 99.9);
    }

    #[test]
    fn non_numeric_falls_back_to_default() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ncommission = lots\n").unwrap();
        assert_eq!(adapter.get_double("backtest", "commission", 0.001), 0.001);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string("[OKX]\nAPI_KEY = k\n").unwrap();
        assert_eq!(adapter.get_string("okx", "api_key"), Some("k".into()));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("execution", "store"), Some("sqlite".into()));
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/tradedesk.ini");
        assert!(matches!(result, Err(TradedeskError::ConfigParse { .. })));
    }
}
