//! Protocol line parsing
//!
//! A line has the shape `[:prefix] VERB [middle...] [:trailing]`. The trailing
//! parameter, when present, is stored as the last entry of `params`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("Empty protocol line")]
    Empty,

    #[error("Protocol line has no verb: {0}")]
    MissingVerb(String),
}

/// One parsed protocol line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrcLine {
    pub prefix: Option<String>,
    pub verb: String,
    pub params: Vec<String>,
}

impl IrcLine {
    pub fn parse(raw: &str) -> Result<Self, LineError> {
        let mut rest = raw.trim_start();
        if rest.trim_end().is_empty() {
            return Err(LineError::Empty);
        }

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, remainder) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = remainder.trim_start();
                Some(prefix.to_string())
            }
            None => None,
        };

        let (verb, mut remainder) = rest.split_once(' ').unwrap_or((rest, ""));
        if verb.is_empty() {
            return Err(LineError::MissingVerb(raw.to_string()));
        }

        let mut params = Vec::new();
        loop {
            remainder = remainder.trim_start_matches(' ');
            if remainder.is_empty() {
                break;
            }
            if let Some(trailing) = remainder.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            let (param, next) = remainder.split_once(' ').unwrap_or((remainder, ""));
            params.push(param.to_string());
            remainder = next;
        }

        Ok(Self {
            prefix,
            verb: verb.to_uppercase(),
            params,
        })
    }

    /// Nick part of the prefix (`nick!user@host` -> `nick`).
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|prefix| prefix.split_once('!').map_or(prefix, |(nick, _)| nick))
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Last parameter, which carries the free text of replies and messages.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }
}
