//! Inbound line dispatch
//!
//! Lines are routed through a static verb table. Handlers run synchronously
//! on the session task, in arrival order; anything slow is spawned.

use std::sync::Arc;

use bancho_domain::{channel_key, user_key};
use bancho_shared::{parse_profile_url, Command, IrcLine};

use crate::entities::{Channel, ChannelEvent, MemberMode, Message, WhoisReply};
use crate::error::ClientError;

use super::{ClientEvent, ClientInner};

type Handler = fn(&Arc<ClientInner>, &IrcLine);

const COMMAND_TABLE: &[(&str, Handler)] = &[
    ("001", on_welcome as Handler),
    ("311", on_whois_user as Handler),
    ("318", on_whois_end as Handler),
    ("319", on_whois_channels as Handler),
    ("332", on_topic as Handler),
    ("353", on_names as Handler),
    ("401", on_no_such_nick as Handler),
    ("403", on_no_such_channel as Handler),
    ("464", on_bad_password as Handler),
    ("JOIN", on_join as Handler),
    ("MODE", on_mode as Handler),
    ("PART", on_part as Handler),
    ("PING", on_ping as Handler),
    ("PRIVMSG", on_privmsg as Handler),
    ("QUIT", on_quit as Handler),
];

/// Replies that carry nothing the client tracks.
const IGNORED: &[&str] = &["312", "333", "366", "372", "375", "376"];

pub(super) fn dispatch(client: &Arc<ClientInner>, line: &IrcLine) {
    if let Some((_, handler)) = COMMAND_TABLE.iter().find(|(verb, _)| *verb == line.verb) {
        handler(client, line);
    } else if !IGNORED.contains(&line.verb.as_str()) {
        tracing::trace!(verb = %line.verb, params = ?line.params, "Unhandled protocol line");
    }
}

fn malformed(line: &IrcLine) {
    tracing::warn!(verb = %line.verb, params = ?line.params, "Malformed protocol line");
}

// =============================================================================
// Connection
// =============================================================================

fn on_welcome(client: &Arc<ClientInner>, _line: &IrcLine) {
    client.on_welcome();
}

fn on_bad_password(client: &Arc<ClientInner>, _line: &IrcLine) {
    client.on_auth_failed();
}

fn on_ping(client: &Arc<ClientInner>, line: &IrcLine) {
    let token = line.trailing().unwrap_or_default().to_string();
    if let Err(err) = client.write_raw(Command::Pong(token)) {
        tracing::debug!(error = %err, "Could not answer PING");
    }
}

// =============================================================================
// Channel membership
// =============================================================================

fn on_join(client: &Arc<ClientInner>, line: &IrcLine) {
    let (Some(nick), Some(name)) = (line.nick(), line.param(0)) else {
        return malformed(line);
    };
    let channel = client.channel(name);
    let user = client.user(nick);

    if client.is_self(&user) {
        tracing::info!(channel = %channel.name(), "Joined channel");
        channel.set_joined(true);
        client
            .joined
            .insert(channel.key().to_string(), Arc::clone(&channel));
        channel.add_member(Arc::clone(&user));
        client.pending().joins.resolve(&channel.key().to_string(), Ok(()));
        if let Some(lobby) = channel.lobby() {
            lobby.on_self_join();
        }
    } else {
        channel.add_member(Arc::clone(&user));
    }

    channel.events().publish(ChannelEvent::Join(Arc::clone(&user)));
    client.events.publish(ClientEvent::Join { user, channel });
}

fn on_part(client: &Arc<ClientInner>, line: &IrcLine) {
    let (Some(nick), Some(name)) = (line.nick(), line.param(0)) else {
        return malformed(line);
    };
    let channel = client.channel(name);
    let user = client.user(nick);

    if client.is_self(&user) {
        tracing::info!(channel = %channel.name(), "Left channel");
        channel.set_joined(false);
        client.joined.remove(channel.key());
        channel.clear_members();
        client.pending().parts.resolve(&channel.key().to_string(), Ok(()));
        if let Some(lobby) = channel.lobby() {
            lobby.on_self_part();
        }
    } else {
        channel.remove_member(&user);
    }

    channel.events().publish(ChannelEvent::Part(Arc::clone(&user)));
    client.events.publish(ClientEvent::Part { user, channel });
}

fn on_quit(client: &Arc<ClientInner>, line: &IrcLine) {
    let Some(nick) = line.nick() else {
        return malformed(line);
    };
    let user = client.user(nick);
    let channels: Vec<Arc<Channel>> = client
        .joined
        .iter()
        .map(|entry| Arc::clone(entry.value()))
        .collect();
    for channel in channels {
        channel.remove_member(&user);
    }
    client.events.publish(ClientEvent::Quit { user });
}

/// `MODE #channel +o nick`
fn on_mode(client: &Arc<ClientInner>, line: &IrcLine) {
    let (Some(name), Some(change), Some(nick)) = (line.param(0), line.param(1), line.param(2))
    else {
        return;
    };
    if !name.starts_with('#') {
        return;
    }
    let mut flags = change.chars();
    let granted = match flags.next() {
        Some('+') => true,
        Some('-') => false,
        _ => return malformed(line),
    };
    let Some(mode) = flags.next().and_then(MemberMode::from_flag) else {
        return;
    };

    let channel = client.channel(name);
    let user = client.user(nick);
    channel.upsert_member(user, if granted { mode } else { MemberMode::Regular });
}

/// `332 <self> #channel :topic`
fn on_topic(client: &Arc<ClientInner>, line: &IrcLine) {
    let (Some(name), Some(topic)) = (line.param(1), line.trailing()) else {
        return malformed(line);
    };
    client.channel(name).set_topic(topic);
}

/// `353 <self> = #channel :@op +voice regular`
fn on_names(client: &Arc<ClientInner>, line: &IrcLine) {
    let (Some(name), Some(names)) = (line.param(2), line.trailing()) else {
        return malformed(line);
    };
    let channel = client.channel(name);
    for entry in names.split_whitespace() {
        let (mode, nick) = MemberMode::split_prefix(entry);
        channel.upsert_member(client.user(nick), mode);
    }
}

/// `403 <self> #channel :No such channel`
fn on_no_such_channel(client: &Arc<ClientInner>, line: &IrcLine) {
    let Some(name) = line.param(1) else {
        return malformed(line);
    };
    tracing::debug!(channel = %name, "Channel not found");
    let key = channel_key(name);
    let error = ClientError::ChannelNotFound(name.to_string());
    {
        let mut pending = client.pending();
        pending.joins.resolve(&key, Err(error.clone()));
        pending.parts.resolve(&key, Err(error));
    }
    client
        .events
        .publish(ClientEvent::ChannelNotFound(name.to_string()));
}

// =============================================================================
// WHOIS
// =============================================================================

/// `401 <self> nick :No such nick`
fn on_no_such_nick(client: &Arc<ClientInner>, line: &IrcLine) {
    let Some(nick) = line.param(1) else {
        return malformed(line);
    };
    let key = user_key(nick);
    client.whois_replies.remove(&key);
    client
        .pending()
        .whois
        .resolve(&key, Err(ClientError::UserNotFound(nick.to_string())));
    client.events.publish(ClientEvent::UserNotFound(nick.to_string()));
}

/// `311 <self> nick https://osu.ppy.sh/u/<id> * :https://osu.ppy.sh/u/<id>`
fn on_whois_user(client: &Arc<ClientInner>, line: &IrcLine) {
    let Some(nick) = line.param(1) else {
        return malformed(line);
    };
    let user_id = line.param(2).and_then(parse_profile_url);
    client
        .whois_replies
        .entry(user_key(nick))
        .or_insert_with(|| WhoisReply::new(client.user(nick).name()))
        .user_id = user_id;
}

/// `319 <self> nick :#osu #mp_1`
fn on_whois_channels(client: &Arc<ClientInner>, line: &IrcLine) {
    let (Some(nick), Some(channels)) = (line.param(1), line.trailing()) else {
        return malformed(line);
    };
    let channels = channels.split_whitespace().map(str::to_string);
    client
        .whois_replies
        .entry(user_key(nick))
        .or_insert_with(|| WhoisReply::new(client.user(nick).name()))
        .channels
        .extend(channels);
}

/// `318 <self> nick :End of /WHOIS list.`
fn on_whois_end(client: &Arc<ClientInner>, line: &IrcLine) {
    let Some(nick) = line.param(1) else {
        return malformed(line);
    };
    let key = user_key(nick);
    let user = client.user(nick);
    let reply = client
        .whois_replies
        .remove(&key)
        .map(|(_, reply)| reply)
        .unwrap_or_else(|| WhoisReply::new(user.name()));
    if let Some(id) = reply.user_id {
        user.learn_id(id);
    }
    client.pending().whois.resolve(&key, Ok(reply));
}

// =============================================================================
// Messages
// =============================================================================

fn on_privmsg(client: &Arc<ClientInner>, line: &IrcLine) {
    let (Some(nick), Some(target), Some(content)) = (line.nick(), line.param(0), line.trailing())
    else {
        return malformed(line);
    };
    let sender = client.user(nick);

    if user_key(target) == client.self_user.key() {
        let message = Message::private(Arc::clone(&sender), client.self_user(), content);
        sender.events().publish(message.clone());
        client.events.publish(ClientEvent::PrivateMessage(message));
        return;
    }

    if !target.starts_with('#') {
        // The gateway echoes undeliverable private messages back to us
        let message = Message::private(client.self_user(), client.user(target), content).sent_by_self();
        client.events.publish(ClientEvent::RejectedMessage(message));
        return;
    }

    let channel = client.channel(target);
    if client.is_bot(&sender) {
        if let Some(lobby) = channel.lobby() {
            lobby.handle_bot_message(content);
        }
    }
    let message = Message::channel(sender, Arc::clone(&channel), content);
    channel
        .events()
        .publish(ChannelEvent::Message(message.clone()));
    client.events.publish(ClientEvent::ChannelMessage(message));
}
