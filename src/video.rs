use std::sync::LazyLock;

use regex::Regex;

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?&]v=([^&#]+)").expect("video id pattern is a valid regex"));

/// Video id from the `v=` query parameter of a watch link.
pub fn video_id(link: &str) -> Option<&str> {
    VIDEO_ID
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Embed player URL for `link`, muted and paused. `None` when the link carries
/// no video id.
pub fn embed_url(link: &str, player_base: &str) -> Option<String> {
    video_id(link).map(|id| format!("{}?v={}&autoplay=0&mute=1", player_base, id))
}
