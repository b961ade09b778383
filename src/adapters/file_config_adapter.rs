//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive. Values are trimmed, and a key
//! with an empty value reads as absent so a blank `threshold_intervals =`
//! line is reported as missing rather than parsed.

use crate::domain::error::ScannerError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;
use std::str::FromStr;

pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScannerError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| ScannerError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, ScannerError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| ScannerError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { ini })
    }

    fn lookup(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T: FromStr>(&self, section: &str, key: &str) -> Option<T> {
        self.lookup(section, key).and_then(|v| v.parse().ok())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.parsed(section, key).unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.parsed(section, key).unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.lookup(section, key)
            .and_then(|v| parse_flag(&v))
            .unwrap_or(default)
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let Some(entries) = self.ini.get_map_ref().get(&section.to_lowercase()) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[postgres]
connection_string = host=localhost dbname=quotes

[scan]
symbol = /MES
interval_minutes = 5

[indicator]
kind = sma_crossover
field_name = cross
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("postgres", "connection_string"),
            Some("host=localhost dbname=quotes".to_string())
        );
        assert_eq!(adapter.get_string("scan", "symbol"), Some("/MES".to_string()));
        assert_eq!(adapter.get_int("scan", "interval_minutes", 1), 5);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[scan]\nsymbol = /MES\n").unwrap();
        assert_eq!(adapter.get_string("scan", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[indicator]\nfast_period = abc\n").unwrap();
        assert_eq!(adapter.get_int("indicator", "fast_period", 42), 42);
        assert_eq!(adapter.get_int("indicator", "slow_period", 7), 7);
    }

    #[test]
    fn get_double_values() {
        let adapter =
            FileConfigAdapter::from_string("[filter]\nwin_points = 20.5\nloss_points = x\n")
                .unwrap();
        assert_eq!(adapter.get_double("filter", "win_points", 0.0), 20.5);
        assert_eq!(adapter.get_double("filter", "loss_points", 9.9), 9.9);
        assert_eq!(adapter.get_double("filter", "missing", 1.5), 1.5);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[scan]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("scan", "a", false));
        assert!(adapter.get_bool("scan", "b", false));
        assert!(adapter.get_bool("scan", "c", false));
        assert!(!adapter.get_bool("scan", "d", true));
        assert!(!adapter.get_bool("scan", "e", true));
        assert!(!adapter.get_bool("scan", "f", true));
        assert!(adapter.get_bool("scan", "missing", true));
    }

    #[test]
    fn blank_values_read_as_absent() {
        let adapter = FileConfigAdapter::from_string(
            "[filter]\nthreshold_intervals =\nwin_points =   12.5  \n[scan]\nuse_rth = On\n",
        )
        .unwrap();
        assert_eq!(adapter.get_string("filter", "threshold_intervals"), None);
        assert_eq!(adapter.get_string("filter", "win_points"), Some("12.5".to_string()));
        assert_eq!(adapter.get_double("filter", "win_points", 0.0), 12.5);
        assert_eq!(adapter.get_int("filter", "threshold_intervals", 30), 30);
        assert!(adapter.get_bool("scan", "use_rth", false));
        // still listed, so unknown-key checks see it
        assert!(adapter.keys("filter").contains(&"threshold_intervals".to_string()));
    }

    #[test]
    fn keys_lists_section_entries() {
        let adapter = FileConfigAdapter::from_string(
            "[filter]\nwin_points = 20\nLoss_Points = 10\n",
        )
        .unwrap();
        assert_eq!(adapter.keys("filter"), vec!["loss_points", "win_points"]);
        assert!(adapter.keys("sweep").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\ncsv_dir = /var/quotes\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "csv_dir"),
            Some("/var/quotes".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        match FileConfigAdapter::from_file("/nonexistent/path/config.ini") {
            Err(ScannerError::ConfigParse { file, .. }) => {
                assert_eq!(file, "/nonexistent/path/config.ini")
            }
            Err(other) => panic!("expected ConfigParse, got {other:?}"),
            Ok(_) => panic!("expected an error"),
        }
    }
}
