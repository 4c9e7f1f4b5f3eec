use std::{env, path::PathBuf, process};

use budget_ledger::{cli::run_cli, config::ConfigManager, init, utils::build_info};

fn main() {
    init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut data_file: Option<PathBuf> = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("{}", build_info::current().summary());
                return Ok(());
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            flag if flag.starts_with('-') => {
                print_usage();
                process::exit(2);
            }
            path => data_file = Some(PathBuf::from(path)),
        }
    }

    let manager = ConfigManager::new()?;
    let mut config = manager.load()?;
    if !manager.path().exists() {
        manager.save(&config)?;
    }
    if let Some(path) = data_file {
        config.data_file = path;
    }
    run_cli(&config)?;
    Ok(())
}

fn print_usage() {
    eprintln!(
        "Usage: budget_ledger [ledger-file]\n\
         Options:\n  \
         -V, --version  print build information\n  \
         -h, --help     print this message\n\
         Environment:\n  \
         BUDGET_LEDGER_HOME    configuration directory (default ~/.budget_ledger)\n  \
         BUDGET_LEDGER_SCRIPT  read commands from stdin without line editing"
    );
}
