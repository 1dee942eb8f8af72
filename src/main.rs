use std::{env, process::ExitCode};

use play_upload::{Result, cli, command, config::Config};

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("play_upload")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

async fn run() -> Result<()> {
    let args = cli::parse_args(env::args_os())?;

    initialize_logger(args.debug)?;

    let config = Config::try_from(args)?;
    command::execute(&config).await?;

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("failed to install panic handler: {err}");
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!();
            eprintln!("ERROR: {err}");
            ExitCode::from(2)
        }
    }
}
