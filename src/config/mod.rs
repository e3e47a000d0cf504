use crate::store::DEFAULT_FILE;
use anyhow::{anyhow, Result};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Table,
    Json,
}

/// Options of the `agenda` binary: `agenda [PATH] [--json]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub path: PathBuf,
    pub format: Format,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_FILE),
            format: Format::default(),
        }
    }
}

impl Config {
    /// Parses the arguments that follow the program name
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut config = Config::default();
        let mut path = None;

        for arg in args {
            match arg.as_str() {
                "--json" => config.format = Format::Json,
                flag if flag.starts_with("--") => return Err(anyhow!("Unknown flag {flag}")),
                _ if path.is_some() => return Err(anyhow!("Unexpected argument {arg}")),
                _ => path = Some(PathBuf::from(&arg)),
            }
        }

        if let Some(path) = path {
            config.path = path;
        }

        Ok(config)
    }
}
