use serde_json::json;

use crate::cli::ConfigCommands;
use crate::error::CliError;
use crate::profiles::CliProfilesConfig;

pub fn run(command: ConfigCommands, profile_name: &str) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_url,
            realtime_url,
        } => run_init(profile_name, api_url, realtime_url),
        ConfigCommands::Show => run_show(profile_name),
        ConfigCommands::Use => run_use(profile_name),
    }
}

fn run_init(
    profile_name: &str,
    api_url: String,
    realtime_url: Option<String>,
) -> Result<(), CliError> {
    // Validate before persisting anything.
    let mut config = trato_core::ClientConfig::new(api_url)?;
    config.realtime_url = realtime_url;
    config.validate()?;

    let mut store = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile = store.profile_mut_or_default(profile_name);
    profile.api_base_url = Some(config.api_base_url.clone());
    profile.realtime_url = config.realtime_url.clone();
    if store.active_profile.is_none() {
        store.active_profile = Some(profile_name.to_string());
    }
    let path = store.save().map_err(CliError::Config)?;

    println!("Profile '{profile_name}' saved to {}", path.display());
    println!("  api:      {}", config.api_base_url);
    println!("  realtime: {}", config.resolved_realtime_url());
    Ok(())
}

fn run_show(profile_name: &str) -> Result<(), CliError> {
    let store = CliProfilesConfig::load().map_err(CliError::Config)?;
    let Some(profile) = store.profile(profile_name) else {
        println!("Profile '{profile_name}' does not exist yet");
        return Ok(());
    };
    // Never print the stored token.
    let redacted = json!({
        "api_base_url": profile.api_base_url,
        "realtime_url": profile.realtime_url,
        "user_id": profile.user_id,
        "access_token": profile.access_token().map(|_| "[REDACTED]"),
    });
    println!("{}", serde_json::to_string_pretty(&redacted)?);
    Ok(())
}

fn run_use(profile_name: &str) -> Result<(), CliError> {
    let mut store = CliProfilesConfig::load().map_err(CliError::Config)?;
    store.active_profile = Some(profile_name.to_string());
    store.save().map_err(CliError::Config)?;
    println!("Active profile set to '{profile_name}'");
    Ok(())
}
