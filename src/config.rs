//! Run configuration, read from a JSON file.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cut_and_choose::CutAndChooseParams;
use crate::error::{ConfigError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default)]
    pub print_output: bool,
    pub circuit_file: PathBuf,
    #[serde(default)]
    pub circuit_index: usize,
    pub garbler_input_file: PathBuf,
    pub evaluator_input_file: PathBuf,
    /// Receive timeout for both parties, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Run cut-and-choose instead of the semi-honest protocol.
    #[serde(default)]
    pub malicious: bool,
    #[serde(default)]
    pub cut_and_choose: CutAndChooseParams,
}

fn default_iterations() -> usize {
    1
}

impl ProtocolConfig {
    /// Reads and validates a config. Relative paths inside the file are
    /// resolved against the file's directory.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: ProtocolConfig = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;

        if let Some(dir) = path.parent() {
            for file in [
                &mut config.circuit_file,
                &mut config.garbler_input_file,
                &mut config.evaluator_input_file,
            ] {
                if file.is_relative() {
                    *file = dir.join(&*file);
                }
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(ConfigError::InvalidParameter("iterations must be positive".to_string()).into());
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::InvalidParameter("timeout_ms must be positive".to_string()).into());
        }
        if self.malicious {
            self.cut_and_choose.validate()?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Parses a string of `0`/`1` characters. Whitespace is ignored so input
/// files may spread bits over several lines.
pub fn parse_bits(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .enumerate()
        .map(|(position, c)| match c {
            '0' => Ok(0),
            '1' => Ok(1),
            _ => Err(ConfigError::InvalidParameter(format!(
                "invalid binary digit {c:?} at position {position}"
            ))
            .into()),
        })
        .collect()
}

pub fn read_input_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<u8>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))?;
    parse_bits(&contents).with_context(|| format!("bad input file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("yao_2pc_config_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_bits() {
        assert_eq!(parse_bits("1 0\n1\n").unwrap(), vec![1, 0, 1]);
        assert_eq!(parse_bits("").unwrap(), Vec::<u8>::new());
        assert!(matches!(
            parse_bits("102"),
            Err(ProtocolError::Configuration(ConfigError::InvalidParameter(_)))
        ));
    }

    #[test]
    fn test_defaults_and_relative_paths() -> anyhow::Result<()> {
        let path = write_temp(
            "defaults.json",
            r#"{
                "circuit_file": "circuits/and.json",
                "garbler_input_file": "garbler.txt",
                "evaluator_input_file": "/abs/evaluator.txt"
            }"#,
        );
        let config = ProtocolConfig::from_json_file(&path)?;
        let dir = path.parent().unwrap();

        assert_eq!(config.iterations, 1);
        assert!(!config.malicious);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.cut_and_choose, CutAndChooseParams::default());
        assert_eq!(config.circuit_file, dir.join("circuits/and.json"));
        assert_eq!(config.garbler_input_file, dir.join("garbler.txt"));
        assert_eq!(config.evaluator_input_file, PathBuf::from("/abs/evaluator.txt"));
        Ok(())
    }

    #[test]
    fn test_rejects_bad_cut_and_choose() {
        let path = write_temp(
            "bad.json",
            r#"{
                "circuit_file": "c.json",
                "garbler_input_file": "g.txt",
                "evaluator_input_file": "e.txt",
                "malicious": true,
                "cut_and_choose": { "num_circuits": 4, "num_checked": 4, "security_parameter": 40 }
            }"#,
        );
        assert!(ProtocolConfig::from_json_file(&path).is_err());
    }

    #[test]
    fn test_read_input_file() -> anyhow::Result<()> {
        let path = write_temp("input.txt", "10\n");
        assert_eq!(read_input_file(&path)?, vec![1, 0]);
        assert!(read_input_file(path.with_extension("missing")).is_err());
        Ok(())
    }
}
