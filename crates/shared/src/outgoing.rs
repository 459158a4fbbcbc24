//! Outgoing protocol commands
//!
//! Every argument passes through a sanitiser before framing so that caller
//! supplied text can never smuggle a second protocol line onto the wire.

use bancho_domain::normalize_user_name;

/// Commands the client sends to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pass(String),
    User(String),
    Nick(String),
    Join(String),
    Part(String),
    Privmsg { target: String, body: String },
    Whois(String),
    Pong(String),
    Quit,
}

impl Command {
    /// Frame the command as one line, without the `\r\n` terminator.
    pub fn to_line(&self) -> String {
        match self {
            Command::Pass(password) => format!("PASS {}", first_line(password)),
            Command::User(name) => {
                let name = sanitize_target(name);
                format!("USER {name} 0 * :{name}")
            }
            Command::Nick(name) => format!("NICK {}", sanitize_target(name)),
            Command::Join(channel) => format!("JOIN {}", sanitize_target(channel)),
            Command::Part(channel) => format!("PART {}", sanitize_target(channel)),
            Command::Privmsg { target, body } => {
                format!("PRIVMSG {} :{}", sanitize_target(target), sanitize_body(body))
            }
            Command::Whois(name) => format!("WHOIS {}", sanitize_target(name)),
            Command::Pong(token) => format!("PONG :{}", sanitize_body(token)),
            Command::Quit => "QUIT".to_string(),
        }
    }

    /// Authentication sequence sent right after the transport opens.
    pub fn handshake(username: &str, password: &str) -> [Command; 3] {
        [
            Command::Pass(password.to_string()),
            Command::User(username.to_string()),
            Command::Nick(username.to_string()),
        ]
    }
}

/// Replace line breaks and NUL in free text with spaces.
pub fn sanitize_body(body: &str) -> String {
    body.chars()
        .map(|c| if matches!(c, '\r' | '\n' | '\0') { ' ' } else { c })
        .collect()
}

/// Sanitise a message target: channels keep their name up to the first
/// forbidden character, users are normalised like registry names.
pub fn sanitize_target(target: &str) -> String {
    if target.starts_with('#') {
        target
            .split(['\r', '\n', '\0', ' ', ','])
            .next()
            .unwrap_or_default()
            .to_string()
    } else {
        normalize_user_name(target)
    }
}

fn first_line(text: &str) -> &str {
    text.split(['\r', '\n']).next().unwrap_or_default()
}
