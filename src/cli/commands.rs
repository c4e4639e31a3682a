use clap::ArgMatches;
use log::info;

use crate::services::PollService;

/// Dispatch subcommands. Returns `Ok(true)` when a subcommand ran and the
/// process should exit instead of entering the monitor loop.
pub async fn handle_subcommands(
    matches: &ArgMatches,
    service: &mut PollService,
) -> Result<bool, Box<dyn std::error::Error>> {
    if let Some(matches) = matches.subcommand_matches("read") {
        info!("🔍 Executing one-shot read...");
        service.read_all_devices_once().await;

        if matches.get_flag("json") {
            service.print_latest_json();
        } else {
            service.print_latest();
        }

        service.shutdown().await;
        return Ok(true);
    }

    Ok(false)
}
