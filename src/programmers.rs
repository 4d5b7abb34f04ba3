//! Programmer registration and dispatch
//!
//! A programmer is whatever gives the host peek/poke access to the target:
//! a debug probe, a download-mode protocol, or the in-memory emulator. This
//! module maps programmer strings like `dummy:id=0x5500baec,bad=3+7` to a
//! [`RemoteMemory`] channel.

use std::collections::HashMap;

use msmnand_core::remote::RemoteMemory;
use thiserror::Error;

/// Errors opening a programmer
#[derive(Debug, Error)]
pub enum ProgrammerError {
    /// No programmer with this name is compiled in
    #[error("Unknown programmer: '{0}' (see list-programmers)")]
    Unknown(String),

    /// Malformed `key=value` option list
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    Format(String),

    /// A parameter value did not parse
    #[error("Invalid value for '{key}': '{value}'")]
    InvalidValue {
        /// Parameter name
        key: String,
        /// Offending value
        value: String,
    },

    /// A parameter the programmer does not understand
    #[error("Unknown parameter for {programmer}: '{key}'")]
    UnknownParameter {
        /// Programmer name
        programmer: String,
        /// Parameter name
        key: String,
    },
}

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "In-memory controller emulator (id=,blocks=,bad=,fail_program=,fail_erase=,protect=)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
        if !p.aliases.is_empty() {
            help.push_str(&format!("  {:12}   aliases: {}\n", "", p.aliases.join(", ")));
        }
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the primary programmer name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Parsed programmer string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammerParams {
    /// Programmer name
    pub name: String,
    /// Options given after the colon
    pub params: HashMap<String, String>,
}

/// Parse `name[:key=value[,key=value]*]`
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, ProgrammerError> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(ProgrammerError::Format(opt.to_string()));
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Parse one numeric parameter value
#[cfg_attr(not(feature = "dummy"), allow(dead_code))]
fn number(key: &str, value: &str) -> Result<u32, ProgrammerError> {
    msmnand_core::partition::parse_number(value).map_err(|_| ProgrammerError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a `+`-separated list of numbers
#[cfg_attr(not(feature = "dummy"), allow(dead_code))]
fn number_list(key: &str, value: &str) -> Result<Vec<u32>, ProgrammerError> {
    value
        .split('+')
        .filter(|v| !v.is_empty())
        .map(|v| number(key, v))
        .collect()
}

/// Open the channel described by `programmer`
pub fn open_channel(programmer: &str) -> Result<Box<dyn RemoteMemory>, ProgrammerError> {
    let params = parse_programmer_params(programmer)?;
    let name = find_programmer(&params.name)
        .ok_or_else(|| ProgrammerError::Unknown(params.name.clone()))?;
    log::debug!("opening programmer {} with {:?}", name, params.params);

    match name {
        #[cfg(feature = "dummy")]
        "dummy" => Ok(Box::new(open_dummy(&params.params)?)),
        _ => Err(ProgrammerError::Unknown(params.name)),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(
    params: &HashMap<String, String>,
) -> Result<msmnand_dummy::DummyNand, ProgrammerError> {
    use msmnand_dummy::{DummyConfig, DummyNand};

    let id = match params.get("id") {
        Some(v) => number("id", v)?,
        None => DummyConfig::default().id,
    };
    let mut config = DummyConfig::for_id(id);
    if let Some(v) = params.get("blocks") {
        config.blocks = number("blocks", v)?;
    }
    if let Some(v) = params.get("scratch_size") {
        config.scratch_size = number("scratch_size", v)?;
    }

    let mut nand = DummyNand::new(config);
    for (key, value) in params {
        match key.as_str() {
            "id" | "blocks" | "scratch_size" => {}
            "bad" => number_list(key, value)?
                .into_iter()
                .for_each(|b| nand.mark_factory_bad(b)),
            "fail_program" => number_list(key, value)?
                .into_iter()
                .for_each(|p| nand.fail_program(p)),
            "fail_erase" => number_list(key, value)?
                .into_iter()
                .for_each(|b| nand.fail_erase(b)),
            "protect" => number_list(key, value)?
                .into_iter()
                .for_each(|b| nand.protect_block(b)),
            _ => {
                return Err(ProgrammerError::UnknownParameter {
                    programmer: "dummy".to_string(),
                    key: key.clone(),
                })
            }
        }
    }
    Ok(nand)
}
