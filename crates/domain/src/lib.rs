
pub mod error;
pub mod lobby;
pub mod mods;
pub mod names;
pub mod score;

pub use error::DomainError;

pub use lobby::{
    validate_size, validate_slot, GameMode, PlayerState, Team, TeamMode, WinCondition,
    LOBBY_SLOTS,
};
pub use mods::{
    from_bit_flags, parse_long_mod, parse_long_mods, parse_short_mod, parse_short_mods,
    to_bit_flags, Mod,
};
pub use names::{
    channel_key, multiplayer_channel_name, multiplayer_id, normalize_user_name, user_key,
    validate_channel_name, MAX_USER_NAME_LENGTH, MULTIPLAYER_CHANNEL_PREFIX,
};
pub use score::{compare_scores, sort_scores, Score};
