//! TOML partition table parsing
//!
//! ```toml
//! [[partition]]
//! name = "boot"
//! start = 0x10
//! length = 5
//!
//! [[partition]]
//! name = "modem"
//! start = 100
//! length = 20
//! type = "modem"
//! ```
//!
//! `start` and `length` are in erase blocks; `type` defaults to `apps`.

use std::format;
use std::fs;
use std::path::Path;
use std::string::String;
use std::vec::Vec;

use super::{PartitionEntry, PartitionTable, PartitionTableError, PartitionType};

#[derive(Debug, serde::Deserialize)]
struct TomlPartitionFile {
    #[serde(default)]
    partition: Vec<TomlPartition>,
}

#[derive(Debug, serde::Deserialize)]
struct TomlPartition {
    name: String,
    #[serde(deserialize_with = "deserialize_number")]
    start: u32,
    #[serde(deserialize_with = "deserialize_number")]
    length: u32,
    #[serde(default, rename = "type")]
    kind: PartitionType,
}

/// Deserialize a u32 given as an integer or as a "0x..." string
fn deserialize_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u32),
        Str(String),
    }

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
pub fn parse_number(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

impl PartitionTable {
    /// Load a partition table from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PartitionTableError> {
        let content = fs::read_to_string(path).map_err(|_| PartitionTableError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parse a partition table from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, PartitionTableError> {
        let file: TomlPartitionFile = toml::from_str(content).map_err(|e| {
            log::debug!("partition table: {}", e);
            PartitionTableError::ParseError
        })?;

        let mut table = PartitionTable::new();
        for p in file.partition {
            table.add(PartitionEntry::new(p.name, p.start, p.length, p.kind));
        }
        Ok(table)
    }

    /// Convert the table to a TOML string
    pub fn to_toml_string(&self) -> String {
        let mut output = String::new();
        for p in self {
            output.push_str("[[partition]]\n");
            output.push_str(&format!("name = \"{}\"\n", p.name));
            output.push_str(&format!("start = {}\n", p.start));
            output.push_str(&format!("length = {}\n", p.length));
            if p.kind != PartitionType::Apps {
                output.push_str(&format!("type = \"{}\"\n", p.kind));
            }
            output.push('\n');
        }
        output
    }
}
