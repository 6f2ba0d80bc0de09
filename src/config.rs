//! Configuration for controlpipe.
//!
//! The [`Config`] struct is not constructable, use [`ConfigBuilder`].
//!
//! # Examples
//!
//! ```
//! # use controlpipe::config::ConfigBuilder;
//! let config = ConfigBuilder::default()
//!     .cmd(vec![String::from("java"), String::from("-jar"), String::from("server.jar")])
//!     .build()
//!     .expect("mission failed");
//! assert_eq!(config.stop_command, "stop");
//! ```

use std::path::PathBuf;

pub const DEFAULT_CONTROL_PATH: &str = "minecraft.control";
pub const DEFAULT_CONTROL_MODE: u32 = 0o660;
pub const DEFAULT_STOP_COMMAND: &str = "stop";

/// Arguments to the supervisor
#[derive(Builder, Clone, Debug)]
#[builder(setter(into))]
#[builder(build_fn(validate = "Self::validate"))]
#[non_exhaustive]
pub struct Config {
    /// Command to run: the server executable, then its arguments.
    pub cmd: Vec<String>,
    /// Where the control pipe lives. Relative paths resolve against the working directory.
    #[builder(default = "PathBuf::from(DEFAULT_CONTROL_PATH)")]
    pub control_path: PathBuf,
    /// Permission bits for the control pipe, used only when creating it.
    #[builder(default = "DEFAULT_CONTROL_MODE")]
    pub control_mode: u32,
    /// Line written to the server when the supervisor is asked to terminate.
    #[builder(default = "DEFAULT_STOP_COMMAND.into()")]
    pub stop_command: String,
    /// Print every relayed command to stdout.
    #[builder(default = "true")]
    pub echo: bool,
    /// Start the server in a session of its own.
    #[builder(default = "true")]
    pub new_session: bool,
}

impl ConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.cmd.as_ref().map_or(true, Vec::is_empty) {
            return Err("cmd must not be empty".into());
        }

        if let Some(stop) = &self.stop_command {
            if stop.contains('\n') {
                return Err("stop_command must be a single line".into());
            }
        }

        if let Some(mode) = self.control_mode {
            if mode > 0o7777 {
                return Err(format!("control_mode {:o} is not a permission mode", mode));
            }
        }

        Ok(())
    }
}
