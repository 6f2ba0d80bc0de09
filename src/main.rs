use std::io::Write;
use std::process;

use controlpipe::{cli, run};
use env_logger::Env;

fn init_logger(debug: bool) {
    let level = if debug { "debug" } else { "warn" };

    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format(|buf, r| writeln!(buf, "*** {}", r.args()))
        .init();
}

fn main() {
    let args = cli::get_args();
    init_logger(args.debug);

    let config = match args.to_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(1);
        }
    };

    match run(config) {
        Ok(outcome) => log::debug!("Exiting after {:?}", outcome),
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(1);
        }
    }
}
