use crate::error::CliError;
use crate::profiles::CliProfilesConfig;

pub fn run_login(profile_name: &str, user_id: i64, token: String) -> Result<(), CliError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidInput("token must not be empty".to_string()));
    }

    let mut store = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile = store.profile_mut_or_default(profile_name);
    profile.user_id = Some(user_id);
    profile.access_token = Some(trimmed.to_string());
    store.save().map_err(CliError::Config)?;

    println!("Signed in as user {user_id} on profile '{profile_name}'");
    Ok(())
}

pub fn run_logout(profile_name: &str) -> Result<(), CliError> {
    let mut store = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile = store.profile_mut_or_default(profile_name);
    profile.user_id = None;
    profile.access_token = None;
    store.save().map_err(CliError::Config)?;

    println!("Signed out of profile '{profile_name}'");
    Ok(())
}

pub fn run_status(profile_name: &str) -> Result<(), CliError> {
    let store = CliProfilesConfig::load().map_err(CliError::Config)?;
    println!("Profile: {profile_name}");
    match store.profile(profile_name) {
        None => println!("  (not configured)"),
        Some(profile) => {
            match profile.api_base_url() {
                Some(url) => println!("  api: {url}"),
                None => println!("  api: (unset)"),
            }
            if profile.is_signed_in() {
                println!(
                    "  signed in as user {}",
                    profile.user_id.unwrap_or_default()
                );
            } else {
                println!("  signed out");
            }
        }
    }
    Ok(())
}
