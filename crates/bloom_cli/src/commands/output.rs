//! Text and JSON rendering of cached state.

use bloom_sync::{Bloom, Profile};
use serde::Serialize;

/// Prints `value` as pretty JSON, or as the text produced by `text`.
pub fn emit<T: Serialize + ?Sized>(
    format: &str,
    value: &T,
    text: impl FnOnce() -> String,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(value)?),
        _ => print!("{}", text()),
    }
    Ok(())
}

/// Renders one bloom as a single line.
pub fn bloom_line(bloom: &Bloom) -> String {
    let mut line = format!(
        "[{}] {} @ {}: {}",
        bloom.id, bloom.sender, bloom.sent_timestamp, bloom.content
    );
    if let Some(original) = &bloom.original_sender {
        line.push_str(&format!(" (rebloomed from {})", original));
    }
    if let Some(count) = bloom.rebloom_count.filter(|c| *c > 0) {
        line.push_str(&format!(" [{} reblooms]", count));
    }
    line
}

/// Renders a list of blooms, one per line.
pub fn blooms_text(blooms: &[Bloom]) -> String {
    if blooms.is_empty() {
        return "No blooms.\n".to_string();
    }
    blooms.iter().map(|b| format!("{}\n", bloom_line(b))).collect()
}

/// Renders a cached profile.
pub fn profile_text(profile: &Profile) -> String {
    let mut out = format!("{}\n", profile.username);
    if let Some(total) = profile.total_blooms {
        out.push_str(&format!("  blooms:    {}\n", total));
    }
    if let Some(followers) = &profile.followers {
        out.push_str(&format!("  followers: {}\n", names(followers)));
    }
    if let Some(follows) = &profile.follows {
        out.push_str(&format!("  follows:   {}\n", names(follows)));
    }
    if profile.is_self == Some(true) {
        out.push_str("  (you)\n");
    } else if profile.is_following == Some(true) {
        out.push_str("  (following)\n");
    }
    if let Some(recent) = &profile.recent_blooms {
        if !recent.is_empty() {
            out.push_str("  recent:\n");
            for bloom in recent {
                out.push_str(&format!("    {}\n", bloom_line(bloom)));
            }
        }
    }
    out
}

/// Renders a list of usernames, one per line.
pub fn usernames_text(usernames: &[String]) -> String {
    if usernames.is_empty() {
        return "Nobody to suggest.\n".to_string();
    }
    usernames.iter().map(|u| format!("{}\n", u)).collect()
}

fn names(usernames: &[String]) -> String {
    if usernames.is_empty() {
        "-".to_string()
    } else {
        usernames.join(", ")
    }
}
