pub mod args;
pub mod client;

pub use args::{Cli, CliCommand, ConditionCliArgs, FlagState, SettingsCliArgs, VolumeCliArgs};
pub use client::RadioClient;

use crate::api::ServiceStatus;
use crate::config::Config;
use anyhow::Result;
use chrono::Local;
use serde_json::Value;

/// Run a client subcommand against the local service. `Version` is handled
/// by the caller.
pub async fn handle_client_command(command: CliCommand) -> Result<()> {
    let config = Config::load()?;
    let client = RadioClient::new(config.service.port);

    match command {
        CliCommand::Version => {}
        CliCommand::Status => print_status(&client.status().await?),
        CliCommand::Toggle => print_message(&client.toggle().await?),
        CliCommand::Volume(args) => print_message(&client.set_volume(&args.value).await?),
        CliCommand::AutoStart => print_message(&client.toggle_auto_start().await?),
        CliCommand::AutoStop => print_message(&client.toggle_auto_stop().await?),
        CliCommand::Settings(args) => {
            let settings = match args.url {
                Some(url) => {
                    let settings = client.set_stream_url(&url).await?;
                    println!("Radio stream URL set to {}.", settings.policy.stream_url);
                    settings
                }
                None => client.settings().await?,
            };
            if let Some(path) = &settings.config_path {
                println!("Config file:  {}", path);
            }
            println!("Stream URL:   {}", settings.policy.stream_url);
            println!("Volume:       {}%", settings.policy.volume_percent());
            println!("Auto-start:   {}", on_off(settings.policy.auto_start));
            println!("Auto-stop:    {}", on_off(settings.policy.auto_stop));
        }
        CliCommand::Condition(args) => {
            let json = client
                .report_condition(&args.flag, args.state.as_bool())
                .await?;
            match json.get("edge") {
                Some(edge) if !edge.is_null() => println!("Role change: {}", edge),
                _ => println!("No role change"),
            }
        }
    }

    Ok(())
}

fn print_message(json: &Value) {
    if let Some(message) = client::message_of(json) {
        println!("{}", message);
    }
}

fn print_status(status: &ServiceStatus) {
    println!("Playback:     {}", status.state.as_str());
    if let Some(since) = status.playing_since {
        println!(
            "Since:        {}",
            since.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("Stream URL:   {}", status.policy.stream_url);
    println!("Volume:       {}%", status.policy.volume_percent());
    println!("Auto-start:   {}", on_off(status.policy.auto_start));
    println!("Auto-stop:    {}", on_off(status.policy.auto_stop));
    println!(
        "Mounted:      driver={} passenger={}",
        status.roles.driving_mounted, status.roles.passenger_mounted
    );
    if let Some(err) = &status.last_error {
        println!("Last error:   {}", err);
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
