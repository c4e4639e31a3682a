use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use log::{info, warn};

use thermolink::cli::handle_subcommands;
use thermolink::config::Config;
use thermolink::services::PollService;

fn build_cli() -> Command {
    Command::new("thermolink")
        .version(thermolink::VERSION)
        .about("Modbus RTU-over-TCP temperature acquisition")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .default_value("thermolink.toml")
                .help("Path to TOML configuration file"),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("SECONDS")
                .help("Override the poll interval"),
        )
        .arg(
            Arg::new("strict-crc")
                .long("strict-crc")
                .action(ArgAction::SetTrue)
                .help("Reject responses whose CRC trailer does not match"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .action(ArgAction::SetTrue)
                .help("Write a default configuration file and exit"),
        )
        .subcommand(
            Command::new("read")
                .about("Poll every enabled device once and print the readings")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print readings as JSON"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = build_cli().get_matches();
    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("thermolink.toml");

    if matches.get_flag("generate-config") {
        Config::default().save_to_file(config_path)?;
        println!("Default configuration written to {}", config_path);
        return Ok(());
    }

    let mut config = if std::path::Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        warn!(
            "Configuration file {} not found, using built-in defaults",
            config_path
        );
        Config::default()
    };

    if let Some(interval) = matches.get_one::<String>("interval") {
        config.poll_interval_seconds = interval.parse()?;
    }
    if matches.get_flag("strict-crc") {
        config.verify_response_crc = true;
    }

    let mut service = PollService::new(config)?;

    if handle_subcommands(&matches, &mut service)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
    {
        return Ok(());
    }

    info!("🖥️  thermolink v{} starting continuous monitor", thermolink::VERSION);
    tokio::select! {
        _ = service.run_continuous() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        }
    }
    service.shutdown().await;
    Ok(())
}
