//! Name rules for users and channels
//!
//! The gateway compares names case-insensitively and renders spaces in user
//! names as underscores; registries key entries by [`user_key`] / [`channel_key`].

use crate::error::DomainError;

/// Longest user name the gateway accepts.
pub const MAX_USER_NAME_LENGTH: usize = 28;

/// Prefix of the channel backing a multiplayer lobby.
pub const MULTIPLAYER_CHANNEL_PREFIX: &str = "#mp_";

/// Normalise a display name into its IRC form: spaces become `_`, anything
/// after the first line break is dropped, and the result is truncated.
pub fn normalize_user_name(name: &str) -> String {
    let first_line = name.split(['\n', '\r']).next().unwrap_or_default();
    first_line
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| *c != '\0')
        .take(MAX_USER_NAME_LENGTH)
        .collect()
}

/// Case-insensitive registry key of a user.
pub fn user_key(name: &str) -> String {
    normalize_user_name(name).to_lowercase()
}

/// Case-insensitive registry key of a channel.
pub fn channel_key(name: &str) -> String {
    name.to_lowercase()
}

/// Check that `name` is a joinable channel name.
pub fn validate_channel_name(name: &str) -> Result<(), DomainError> {
    let valid = name.len() > 1
        && name.starts_with('#')
        && !name
            .chars()
            .any(|c| matches!(c, ',' | ' ' | '\x07' | '\r' | '\n' | '\0'));

    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidChannelName(name.to_string()))
    }
}

/// Lobby id of a `#mp_<id>` channel, `None` for every other channel.
pub fn multiplayer_id(channel_name: &str) -> Option<u64> {
    let digits = channel_name.strip_prefix(MULTIPLAYER_CHANNEL_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Channel name of the lobby with the given id.
pub fn multiplayer_channel_name(id: u64) -> String {
    format!("{MULTIPLAYER_CHANNEL_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_replaces_spaces_and_truncates() {
        assert_eq!(normalize_user_name("Cookiezi Fan"), "Cookiezi_Fan");
        assert_eq!(normalize_user_name("line one\nline two"), "line_one");
        let long = "a".repeat(40);
        assert_eq!(normalize_user_name(&long).len(), MAX_USER_NAME_LENGTH);
    }

    #[test]
    fn test_user_key_is_case_insensitive() {
        assert_eq!(user_key("Bancho Bot"), user_key("bancho_BOT"));
    }

    #[test]
    fn test_validate_channel_name() {
        assert!(validate_channel_name("#osu").is_ok());
        assert!(validate_channel_name("#mp_123").is_ok());
        assert!(validate_channel_name("osu").is_err());
        assert!(validate_channel_name("#").is_err());
        assert!(validate_channel_name("#a,#b").is_err());
        assert!(validate_channel_name("#a b").is_err());
        assert!(validate_channel_name("#bell\x07").is_err());
        assert!(validate_channel_name("#osu\r\nQUIT").is_err());
    }

    #[test]
    fn test_multiplayer_id() {
        assert_eq!(multiplayer_id("#mp_45780612"), Some(45780612));
        assert_eq!(multiplayer_id("#mp_"), None);
        assert_eq!(multiplayer_id("#mp_12a"), None);
        assert_eq!(multiplayer_id("#osu"), None);
        assert_eq!(multiplayer_channel_name(42), "#mp_42");
    }
}
