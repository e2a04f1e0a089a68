//! Signup command implementation.

use super::output::{emit, profile_text};
use super::{require, Auth, Client, CmdResult};
use bloom_sync::Profile;

/// Registers an account and prints its profile.
pub async fn signup(client: &Client, auth: &Auth, format: &str) -> CmdResult {
    let (username, password) = auth.credentials()?;
    let response = require(client.signup(username, password).await, "signup")?;
    if !response.success {
        return Err("signup was not accepted".into());
    }

    let state = client.state();
    let profile = state
        .profile(username)
        .cloned()
        .unwrap_or_else(|| Profile::new(username));
    emit(format, &profile, || {
        format!("Registered {}.\n{}", username, profile_text(&profile))
    })
}
