use std::ffi::OsString;
use std::path::PathBuf;
use std::process;

use clap::{App, AppSettings, Arg, Error, ErrorKind};

use crate::config::{
    Config, ConfigBuilder, DEFAULT_CONTROL_MODE, DEFAULT_CONTROL_PATH, DEFAULT_STOP_COMMAND,
};

#[derive(Debug)]
pub struct Args {
    pub cmd: Vec<String>,
    pub control_path: PathBuf,
    pub control_mode: u32,
    pub stop_command: String,
    pub echo: bool,
    pub new_session: bool,
    pub debug: bool,
}

impl Args {
    pub fn to_config(&self) -> Result<Config, String> {
        ConfigBuilder::default()
            .cmd(self.cmd.clone())
            .control_path(self.control_path.clone())
            .control_mode(self.control_mode)
            .stop_command(self.stop_command.clone())
            .echo(self.echo)
            .new_session(self.new_session)
            .build()
    }
}

/// Parses the process arguments, exiting on any usage problem.
///
/// Asking for help counts as a usage problem and exits with status 1, like
/// every other malformed invocation. Only `--version` exits successfully.
pub fn get_args() -> Args {
    match parse(std::env::args_os()) {
        Ok(args) => args,
        Err(err) => {
            if err.kind == ErrorKind::HelpDisplayed {
                println!("{}", err.message);
                process::exit(1);
            }
            err.exit()
        }
    }
}

pub fn parse<I, T>(argv: I) -> Result<Args, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = app().get_matches_from_safe(argv)?;

    let cmd = values_t!(args.values_of("command"), String)?;
    let control_mode = args
        .value_of("mode")
        .and_then(|mode| u32::from_str_radix(mode, 8).ok())
        .unwrap_or(DEFAULT_CONTROL_MODE);

    Ok(Args {
        cmd,
        control_path: PathBuf::from(args.value_of("control").unwrap_or(DEFAULT_CONTROL_PATH)),
        control_mode,
        stop_command: args.value_of("stop-command").unwrap_or(DEFAULT_STOP_COMMAND).to_string(),
        echo: !args.is_present("no-echo"),
        new_session: !args.is_present("same-session"),
        debug: args.is_present("verbose"),
    })
}

fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("controlpipe")
        .version(crate_version!())
        .about("Run a server and relay lines written to a named pipe to its console")
        .usage("controlpipe [OPTIONS] /path/to/java -jar /path/to/server.jar [-arguments...]")
        .setting(AppSettings::TrailingVarArg)
        .arg(Arg::with_name("control")
                 .help("Named pipe to read commands from, created if missing")
                 .short("c")
                 .long("control")
                 .takes_value(true)
                 .value_name("path")
                 .default_value(DEFAULT_CONTROL_PATH))
        .arg(Arg::with_name("mode")
                 .help("Permissions of the named pipe when it gets created, in octal")
                 .long("mode")
                 .takes_value(true)
                 .value_name("mode")
                 .default_value("660")
                 .validator(validate_mode))
        .arg(Arg::with_name("stop-command")
                 .help("Line sent to the server on SIGINT, SIGTERM or SIGHUP")
                 .long("stop-command")
                 .takes_value(true)
                 .value_name("line")
                 .default_value(DEFAULT_STOP_COMMAND))
        .arg(Arg::with_name("no-echo")
                 .help("Do not print relayed commands")
                 .long("no-echo"))
        .arg(Arg::with_name("same-session")
                 .help("Keep the server in our session, so terminal signals reach it directly")
                 .long("same-session"))
        .arg(Arg::with_name("verbose")
                 .help("Print debugging messages to stderr")
                 .short("v")
                 .long("verbose"))
        .arg(Arg::with_name("command")
                 .help("Server executable followed by its arguments")
                 .multiple(true)
                 .required(true)
                 .min_values(2))
}

#[allow(clippy::needless_pass_by_value)]
fn validate_mode(mode: String) -> Result<(), String> {
    match u32::from_str_radix(&mode, 8) {
        Ok(m) if m <= 0o7777 => Ok(()),
        _ => Err(format!("'{}' is not an octal permission mode", mode)),
    }
}
