// src/main.rs

use trigger::errors::exit_code;
use trigger::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("trigger error: {err:?}");
            std::process::exit(exit_code::USAGE);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let invocation = match cli::parse() {
        Ok(invocation) => invocation,
        Err(err) => {
            err.print();
            return Ok(err.exit_code());
        }
    };
    logging::init_logging(invocation.args.log_level)?;

    match run(invocation).await {
        Ok(outcome) => Ok(outcome.exit_code()),
        Err(err) => {
            eprintln!("trigger: {err}");
            Ok(err.exit_code())
        }
    }
}
