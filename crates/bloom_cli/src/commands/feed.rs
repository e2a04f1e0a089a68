//! Bloom reading and publishing commands.

use super::output::{bloom_line, blooms_text, emit};
use super::{require, Auth, Client, CmdResult};
use serde_json::json;

/// Prints the home timeline.
pub async fn timeline(client: &Client, auth: &Auth, format: &str) -> CmdResult {
    // login already loads the timeline
    auth.login(client).await?;
    let blooms = client.state().timeline_blooms;
    emit(format, &blooms, || blooms_text(&blooms))
}

/// Prints the blooms of `user`.
pub async fn blooms(client: &Client, user: &str, format: &str) -> CmdResult {
    client.get_blooms(Some(user)).await;
    let blooms = client
        .state()
        .profile(user)
        .and_then(|p| p.blooms.clone())
        .unwrap_or_default();
    emit(format, &blooms, || blooms_text(&blooms))
}

/// Prints one bloom.
pub async fn bloom(client: &Client, id: i64, format: &str) -> CmdResult {
    require(client.get_bloom(id).await, "fetching bloom")?;
    let bloom = client
        .state()
        .single_bloom
        .ok_or("bloom missing from cache")?;
    emit(format, &bloom, || format!("{}\n", bloom_line(&bloom)))
}

/// Publishes a bloom and prints the refreshed timeline.
pub async fn post(client: &Client, auth: &Auth, content: &str, format: &str) -> CmdResult {
    auth.login(client).await?;
    let response = require(client.post_bloom(content).await, "post")?;
    print_refreshed(client, response.success, format)
}

/// Reshares bloom `id` and prints the refreshed timeline.
pub async fn rebloom(client: &Client, auth: &Auth, id: i64, format: &str) -> CmdResult {
    auth.login(client).await?;
    let original = require(client.get_bloom(id).await, "fetching bloom")?;
    let response = require(client.rebloom(&original).await, "rebloom")?;
    print_refreshed(client, response.success, format)
}

fn print_refreshed(client: &Client, success: bool, format: &str) -> CmdResult {
    let blooms = client.state().timeline_blooms;
    emit(
        format,
        &json!({ "success": success, "timeline": blooms }),
        || {
            let status = if success { "Posted." } else { "Not posted." };
            format!("{}\n{}", status, blooms_text(&blooms))
        },
    )
}

/// Prints blooms tagged with `tag`.
pub async fn hashtag(client: &Client, tag: &str, format: &str) -> CmdResult {
    require(client.get_blooms_by_hashtag(tag).await, "hashtag search")?;
    let state = client.state();
    let current = state.current_hashtag.unwrap_or_default();
    let blooms = state.hashtag_blooms;
    emit(
        format,
        &json!({ "hashtag": current, "blooms": blooms }),
        || format!("{}\n{}", current, blooms_text(&blooms)),
    )
}
