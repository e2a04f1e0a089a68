//! Profile and follow graph commands.

use super::output::{emit, profile_text, usernames_text};
use super::{require, Auth, Client, CmdResult};
use bloom_sync::Profile;

/// Prints a profile.
///
/// Without `user` the logged-in account is resolved through the API. With a
/// user, credentials are optional; when given, follow state is included.
pub async fn profile(client: &Client, auth: &Auth, user: Option<&str>, format: &str) -> CmdResult {
    if user.is_none() || auth.is_present() {
        auth.login(client).await?;
    }

    let username = match user {
        Some(user) => {
            require(client.get_profile(Some(user)).await, "fetching profile")?;
            user.to_string()
        }
        None => require(client.get_profile(None).await, "fetching profile")?
            .username
            .ok_or("profile has no username")?,
    };

    print_profile(client, &username, format)
}

/// Follows or unfollows `user` and prints their refreshed profile.
pub async fn follow(
    client: &Client,
    auth: &Auth,
    user: &str,
    follow: bool,
    format: &str,
) -> CmdResult {
    auth.login(client).await?;
    let response = if follow {
        require(client.follow_user(user).await, "follow")?
    } else {
        require(client.unfollow_user(user).await, "unfollow")?
    };
    if !response.success {
        return Err(format!("server declined to change follow state for {}", user).into());
    }
    print_profile(client, user, format)
}

/// Prints who to follow.
pub async fn suggestions(client: &Client, auth: &Auth, format: &str) -> CmdResult {
    // login already loads suggestions
    auth.login(client).await?;
    let usernames = client.state().who_to_follow;
    emit(format, &usernames, || usernames_text(&usernames))
}

fn print_profile(client: &Client, username: &str, format: &str) -> CmdResult {
    let profile = client
        .state()
        .profile(username)
        .cloned()
        .unwrap_or_else(|| Profile::new(username));
    emit(format, &profile, || profile_text(&profile))
}
