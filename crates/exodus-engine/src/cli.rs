//! Command-line arguments.

use std::path::PathBuf;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "exodus-config.yaml";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Configuration file to load.
    pub config: PathBuf,
    /// Graph file overriding `input.graph`.
    pub graph: Option<PathBuf>,
    /// Run the worker-count timing sweep instead of a normal run.
    pub time_trial: bool,
}

impl Args {
    /// Parse arguments, excluding the program name.
    ///
    /// Accepts `--config <path>`, `--graph <path>` and `--time-trial`.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, EngineError> {
        let mut parsed = Self {
            config: PathBuf::from(DEFAULT_CONFIG_PATH),
            graph: None,
            time_trial: false,
        };
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => parsed.config = PathBuf::from(value_for(&arg, args.next())?),
                "--graph" => parsed.graph = Some(PathBuf::from(value_for(&arg, args.next())?)),
                "--time-trial" => parsed.time_trial = true,
                other => {
                    return Err(EngineError::Usage {
                        message: format!(
                            "unknown argument {other}; expected --config <path>, --graph <path>, --time-trial"
                        ),
                    });
                }
            }
        }
        Ok(parsed)
    }
}

fn value_for(flag: &str, value: Option<String>) -> Result<String, EngineError> {
    value.ok_or_else(|| EngineError::Usage {
        message: format!("{flag} needs a value"),
    })
}
