//! Gameplay mods codec.
//!
//! Every mod is an immutable `(bit value, short code, long name)` triple taken from
//! one process-wide table. The codec converts between the numeric bit flags used by
//! the statistics API and `!mp mods`, the two-letter codes players type, and the long
//! names the bot prints in its replies.

use std::fmt;

/// A gameplay modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mod {
    bits: u32,
    short_code: &'static str,
    long_name: &'static str,
}

impl Mod {
    const fn new(bits: u32, short_code: &'static str, long_name: &'static str) -> Self {
        Self {
            bits,
            short_code,
            long_name,
        }
    }

    pub const NONE: Mod = Mod::new(0, "none", "None");
    pub const NO_FAIL: Mod = Mod::new(1, "nf", "NoFail");
    pub const EASY: Mod = Mod::new(2, "ez", "Easy");
    pub const HIDDEN: Mod = Mod::new(8, "hd", "Hidden");
    pub const HARD_ROCK: Mod = Mod::new(16, "hr", "HardRock");
    pub const SUDDEN_DEATH: Mod = Mod::new(32, "sd", "SuddenDeath");
    pub const DOUBLE_TIME: Mod = Mod::new(64, "dt", "DoubleTime");
    pub const RELAX: Mod = Mod::new(128, "rx", "Relax");
    pub const HALF_TIME: Mod = Mod::new(256, "ht", "HalfTime");
    pub const NIGHTCORE: Mod = Mod::new(512, "nc", "Nightcore");
    pub const FLASHLIGHT: Mod = Mod::new(1024, "fl", "Flashlight");
    pub const AUTOPLAY: Mod = Mod::new(2048, "at", "Auto");
    pub const SPUN_OUT: Mod = Mod::new(4096, "so", "SpunOut");
    pub const RELAX2: Mod = Mod::new(8192, "ap", "Relax2");
    pub const PERFECT: Mod = Mod::new(16384, "pf", "Perfect");
    pub const KEY4: Mod = Mod::new(32768, "k4", "Key4");
    pub const KEY5: Mod = Mod::new(65536, "k5", "Key5");
    pub const KEY6: Mod = Mod::new(131072, "k6", "Key6");
    pub const KEY7: Mod = Mod::new(262144, "k7", "Key7");
    pub const KEY8: Mod = Mod::new(524288, "k8", "Key8");
    pub const FADE_IN: Mod = Mod::new(1048576, "fi", "FadeIn");
    pub const RANDOM: Mod = Mod::new(2097152, "rn", "Random");
    pub const LAST_MOD: Mod = Mod::new(4194304, "lm", "LastMod");
    pub const KEY9: Mod = Mod::new(16777216, "k9", "Key9");
    pub const KEY10: Mod = Mod::new(33554432, "k10", "Key10");
    pub const KEY1: Mod = Mod::new(67108864, "k1", "Key1");
    pub const KEY3: Mod = Mod::new(134217728, "k3", "Key3");
    pub const KEY2: Mod = Mod::new(268435456, "k2", "Key2");

    /// The full mod table, `None` first, then ascending bit order.
    pub const ALL: [Mod; 28] = [
        Mod::NONE,
        Mod::NO_FAIL,
        Mod::EASY,
        Mod::HIDDEN,
        Mod::HARD_ROCK,
        Mod::SUDDEN_DEATH,
        Mod::DOUBLE_TIME,
        Mod::RELAX,
        Mod::HALF_TIME,
        Mod::NIGHTCORE,
        Mod::FLASHLIGHT,
        Mod::AUTOPLAY,
        Mod::SPUN_OUT,
        Mod::RELAX2,
        Mod::PERFECT,
        Mod::KEY4,
        Mod::KEY5,
        Mod::KEY6,
        Mod::KEY7,
        Mod::KEY8,
        Mod::FADE_IN,
        Mod::RANDOM,
        Mod::LAST_MOD,
        Mod::KEY9,
        Mod::KEY10,
        Mod::KEY1,
        Mod::KEY3,
        Mod::KEY2,
    ];

    /// Value as stored by the game servers and returned by the statistics API.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Short code used by `!mp mods` (e.g. `hd`).
    pub fn short_code(&self) -> &'static str {
        self.short_code
    }

    /// Long name without spaces, as printed by the bot (e.g. `Hidden`).
    pub fn long_name(&self) -> &'static str {
        self.long_name
    }
}

impl fmt::Display for Mod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name)
    }
}

/// Decode bit flags into mods, in table order.
///
/// `0` decodes to `[Mod::NONE]` when `none_when_empty` is set, otherwise to an
/// empty list.
pub fn from_bit_flags(bits: u32, none_when_empty: bool) -> Vec<Mod> {
    if bits == 0 {
        return if none_when_empty {
            vec![Mod::NONE]
        } else {
            Vec::new()
        };
    }

    Mod::ALL
        .iter()
        .filter(|m| **m != Mod::NONE && bits & m.bits == m.bits)
        .copied()
        .collect()
}

/// Encode mods as bit flags (sum of the bit values).
pub fn to_bit_flags(mods: &[Mod]) -> u32 {
    mods.iter().map(Mod::bits).sum()
}

/// Case-insensitive lookup of a short code.
pub fn parse_short_mod(code: &str) -> Option<Mod> {
    Mod::ALL
        .iter()
        .find(|m| m.short_code.eq_ignore_ascii_case(code))
        .copied()
}

/// Case-insensitive lookup of a long name.
pub fn parse_long_mod(name: &str) -> Option<Mod> {
    Mod::ALL
        .iter()
        .find(|m| m.long_name.eq_ignore_ascii_case(name))
        .copied()
}

/// Parse short codes separated by commas or spaces, or concatenated in pairs
/// (`"HDDT"`). Unknown codes are skipped.
pub fn parse_short_mods(input: &str) -> Vec<Mod> {
    let tokens: Vec<String> = if input.contains(',') {
        input.split(',').map(str::to_owned).collect()
    } else if input.contains(' ') {
        input.split(' ').map(str::to_owned).collect()
    } else if input.chars().count() % 2 == 0 {
        let chars: Vec<char> = input.chars().collect();
        chars.chunks(2).map(|pair| pair.iter().collect()).collect()
    } else {
        vec![input.to_owned()]
    };

    tokens
        .iter()
        .filter_map(|token| parse_short_mod(token.trim()))
        .collect()
}

/// Parse long names separated by commas or spaces. Unknown names are skipped.
pub fn parse_long_mods(input: &str) -> Vec<Mod> {
    let tokens: Vec<&str> = if input.contains(',') {
        input.split(',').collect()
    } else {
        input.split(' ').collect()
    };

    tokens
        .into_iter()
        .filter_map(|token| parse_long_mod(token.trim()))
        .collect()
}
