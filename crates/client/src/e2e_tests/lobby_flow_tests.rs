//! Multiplayer lobby flows driven by scripted bot replies.

use std::sync::Arc;
use std::time::Duration;

use bancho_domain::{PlayerState, Score, TeamMode, WinCondition, LOBBY_SLOTS};
use tokio::sync::mpsc::UnboundedReceiver;

use super::*;
use crate::{Client, ClientError, Lobby, LobbyEvent};

const ROOM: &str = "#mp_1";

struct LobbyFixture {
    // Keeps the listener open for the duration of the test
    _gateway: FakeGateway,
    client: Client,
    session: GatewaySession,
    lobby: Arc<Lobby>,
    events: UnboundedReceiver<LobbyEvent>,
}

/// Connect, join `#mp_1` and answer the automatic `!mp settings` with an
/// empty room.
async fn joined_lobby(stats: FakeStats) -> LobbyFixture {
    let gateway = FakeGateway::bind().await;
    let client = Client::with_stats(gateway.config(), stats.into_arc());
    let mut session = connect(&client, &gateway).await;

    let channel = client.channel(ROOM).expect("valid name");
    let lobby = channel.lobby().expect("multiplayer channel has a lobby");
    let mut events = lobby.events().subscribe_channel();

    let joining = tokio::spawn({
        let channel = channel.clone();
        async move { channel.join().await }
    });
    session.confirm_join(ROOM).await;
    joining.await.expect("join task").expect("joined");

    session.expect_line(&format!("PRIVMSG {ROOM} :!mp settings ")).await;
    session
        .bot_says(ROOM, "Room name: test lobby, History: https://osu.ppy.sh/mp/1")
        .await;
    session
        .bot_says(ROOM, "Team mode: HeadToHead, Win condition: Score")
        .await;
    session.bot_says(ROOM, "Players: 0").await;
    wait_for(&mut events, |event| matches!(event, LobbyEvent::Slots(_))).await;

    LobbyFixture {
        _gateway: gateway,
        client,
        session,
        lobby,
        events,
    }
}

/// Run a full `!mp settings` round trip answering with `slot_lines`.
async fn refresh_with(fixture: &mut LobbyFixture, slot_lines: &[&str]) {
    let refreshing = tokio::spawn({
        let lobby = Arc::clone(&fixture.lobby);
        async move { lobby.update_settings().await }
    });
    fixture
        .session
        .expect_line(&format!("PRIVMSG {ROOM} :!mp settings "))
        .await;
    fixture
        .session
        .bot_says(ROOM, &format!("Players: {}", slot_lines.len()))
        .await;
    for line in slot_lines {
        fixture.session.bot_says(ROOM, line).await;
    }
    refreshing
        .await
        .expect("refresh task")
        .expect("settings refreshed");
}

fn slot_name(lobby: &Lobby, slot: usize) -> Option<String> {
    lobby.slots()[slot].as_ref().map(|player| player.name().to_string())
}

#[tokio::test]
async fn test_join_refreshes_lobby_state() {
    let fixture = joined_lobby(FakeStats::new()).await;

    assert_eq!(fixture.lobby.name(), "test lobby");
    assert_eq!(fixture.lobby.team_mode(), Some(TeamMode::HeadToHead));
    assert_eq!(fixture.lobby.win_condition(), Some(WinCondition::Score));
    assert_eq!(fixture.lobby.slots().len(), LOBBY_SLOTS);
    assert!(fixture.lobby.slots().iter().all(Option::is_none));
    assert_eq!(
        fixture.lobby.history_url(),
        "https://osu.ppy.sh/community/matches/1"
    );
}

#[tokio::test]
async fn test_settings_listing_seats_players_without_lookups() {
    let mut fixture = joined_lobby(FakeStats::new()).await;
    refresh_with(
        &mut fixture,
        &[
            "Slot 1  Ready     https://osu.ppy.sh/u/2 peppy           [Host / Team Blue / Hidden]",
            "Slot 4  Not Ready https://osu.ppy.sh/u/9 [Toy]           ",
        ],
    )
    .await;

    assert_eq!(slot_name(&fixture.lobby, 0).as_deref(), Some("peppy"));
    assert_eq!(slot_name(&fixture.lobby, 3).as_deref(), Some("[Toy]"));
    let host = fixture.lobby.host().expect("host seated");
    assert_eq!(host.name(), "peppy");
    assert_eq!(host.user.id(), Some(2));
    assert_eq!(fixture.lobby.player_slot("PEPPY"), Some(0));
}

#[tokio::test]
async fn test_set_map_resolves_on_beatmap_line() {
    let stats = FakeStats::new().with_beatmap(75, "Kenji Ninuma", "DISCO PRINCE");
    let mut fixture = joined_lobby(stats).await;

    let setting = tokio::spawn({
        let lobby = Arc::clone(&fixture.lobby);
        async move { lobby.set_map(75, None).await }
    });
    fixture
        .session
        .expect_line(&format!("PRIVMSG {ROOM} :!mp map 75 0 "))
        .await;
    fixture
        .session
        .bot_says(
            ROOM,
            "Beatmap changed to: Kenji Ninuma - DISCO PRINCE (https://osu.ppy.sh/b/75)",
        )
        .await;

    setting.await.expect("map task").expect("map set");
    assert_eq!(fixture.lobby.beatmap_id(), Some(75));

    let event = wait_for(&mut fixture.events, |event| {
        matches!(event, LobbyEvent::Beatmap(_))
    })
    .await;
    let LobbyEvent::Beatmap(beatmap) = event else {
        unreachable!("filtered above");
    };
    assert_eq!(beatmap.title, "DISCO PRINCE");
    assert_eq!(fixture.lobby.beatmap().map(|beatmap| beatmap.id), Some(75));
}

#[tokio::test]
async fn test_invalid_map_fails_set_map() {
    let mut fixture = joined_lobby(FakeStats::new()).await;

    let setting = tokio::spawn({
        let lobby = Arc::clone(&fixture.lobby);
        async move { lobby.set_map(0, None).await }
    });
    fixture.session.expect_line(&format!("PRIVMSG {ROOM} :!mp map 0")).await;
    fixture.session.bot_says(ROOM, "Invalid map ID provided").await;

    let result = setting.await.expect("map task");
    assert!(matches!(result, Err(ClientError::InvalidBeatmap)));
}

#[tokio::test]
async fn test_match_settings_line_updates_lobby_and_clears_ready() {
    let mut fixture = joined_lobby(FakeStats::new()).await;
    refresh_with(
        &mut fixture,
        &[
            "Slot 1  Ready     https://osu.ppy.sh/u/2 peppy           [Host]",
            "Slot 2  Ready     https://osu.ppy.sh/u/9 Toy             ",
        ],
    )
    .await;

    let setting = tokio::spawn({
        let lobby = Arc::clone(&fixture.lobby);
        async move {
            lobby
                .set_settings(TeamMode::TagTeamVs, WinCondition::Accuracy, Some(7))
                .await
        }
    });
    fixture
        .session
        .expect_line(&format!("PRIVMSG {ROOM} :!mp set 3 1 7 "))
        .await;
    fixture
        .session
        .bot_says(ROOM, "Changed match settings to 7 slots, TagTeamVs, Accuracy")
        .await;
    setting.await.expect("settings task").expect("settings applied");

    assert_eq!(fixture.lobby.size(), 7);
    assert_eq!(fixture.lobby.team_mode(), Some(TeamMode::TagTeamVs));
    assert_eq!(fixture.lobby.win_condition(), Some(WinCondition::Accuracy));
    assert!(fixture
        .lobby
        .slots()
        .iter()
        .flatten()
        .all(|player| player.state == PlayerState::NotReady));

    let event = wait_for(&mut fixture.events, |event| {
        matches!(event, LobbyEvent::MatchSettings { .. })
    })
    .await;
    assert!(matches!(
        event,
        LobbyEvent::MatchSettings {
            size: Some(7),
            team_mode: TeamMode::TagTeamVs,
            win_condition: Some(WinCondition::Accuracy),
        }
    ));
}

#[tokio::test]
async fn test_slot_updates_apply_in_arrival_order() {
    let stats = FakeStats::new()
        .with_user(10, "Slow Player", Duration::from_millis(200))
        .with_user(11, "Quick", Duration::ZERO);
    let mut fixture = joined_lobby(stats).await;

    fixture.session.bot_says(ROOM, "Slow Player joined in slot 5.").await;
    fixture.session.bot_says(ROOM, "Slow Player moved to slot 2").await;
    fixture.session.bot_says(ROOM, "Quick joined in slot 5.").await;

    let mut order = Vec::new();
    while order.len() < 3 {
        let event = wait_for(&mut fixture.events, |event| {
            matches!(
                event,
                LobbyEvent::PlayerJoined { .. } | LobbyEvent::PlayerMoved { .. }
            )
        })
        .await;
        match event {
            LobbyEvent::PlayerJoined { player, slot, .. } => {
                order.push(format!("{} joined {slot}", player.name()))
            }
            LobbyEvent::PlayerMoved { player, slot } => {
                order.push(format!("{} moved {slot}", player.name()))
            }
            _ => unreachable!("filtered above"),
        }
    }

    assert_eq!(
        order,
        vec!["Slow_Player joined 4", "Slow_Player moved 1", "Quick joined 4"]
    );
    assert_eq!(slot_name(&fixture.lobby, 1).as_deref(), Some("Slow_Player"));
    assert_eq!(slot_name(&fixture.lobby, 4).as_deref(), Some("Quick"));
    assert_eq!(fixture.lobby.slots().iter().flatten().count(), 2);
}

#[tokio::test]
async fn test_match_finish_sorts_scores() {
    let mut fixture = joined_lobby(FakeStats::new()).await;
    refresh_with(
        &mut fixture,
        &[
            "Slot 1  Ready     https://osu.ppy.sh/u/1 one             ",
            "Slot 2  Ready     https://osu.ppy.sh/u/2 two             ",
            "Slot 3  Ready     https://osu.ppy.sh/u/3 three           ",
            "Slot 4  Ready     https://osu.ppy.sh/u/4 four            ",
            "Slot 5  Ready     https://osu.ppy.sh/u/5 five            ",
        ],
    )
    .await;

    fixture.session.bot_says(ROOM, "The match has started!").await;
    for line in [
        "one finished playing (Score: 500000, FAILED).",
        "two finished playing (Score: 500000, PASSED).",
        "three finished playing (Score: 1000000, PASSED).",
        "four finished playing (Score: 800000, PASSED).",
        "five finished playing (Score: 900000, FAILED).",
    ] {
        fixture.session.bot_says(ROOM, line).await;
    }
    fixture.session.bot_says(ROOM, "The match has finished!").await;

    let event = wait_for(&mut fixture.events, |event| {
        matches!(event, LobbyEvent::MatchFinished(_))
    })
    .await;
    let LobbyEvent::MatchFinished(scores) = event else {
        unreachable!("filtered above");
    };
    assert_eq!(
        scores,
        vec![
            Score::new("three", 1_000_000, true),
            Score::new("four", 800_000, true),
            Score::new("two", 500_000, true),
            Score::new("five", 900_000, false),
            Score::new("one", 500_000, false),
        ]
    );
    assert!(!fixture.lobby.playing());
    assert_eq!(fixture.lobby.scores(), scores);
}

#[tokio::test]
async fn test_connection_loss_fails_pending_operations() {
    let mut fixture = joined_lobby(FakeStats::new()).await;

    let locking = tokio::spawn({
        let lobby = Arc::clone(&fixture.lobby);
        async move { lobby.lock_slots().await }
    });
    fixture
        .session
        .expect_line(&format!("PRIVMSG {ROOM} :!mp lock "))
        .await;
    drop(fixture.session);

    let result = locking.await.expect("lock task");
    assert!(matches!(result, Err(ClientError::Transport(_))));
    assert!(!fixture.client.is_connected());
}

#[tokio::test]
async fn test_create_lobby_waits_for_bot_confirmation() {
    let gateway = FakeGateway::bind().await;
    let client = Client::with_stats(gateway.config(), FakeStats::new().into_arc());
    let mut session = connect(&client, &gateway).await;

    let creating = tokio::spawn({
        let client = client.clone();
        async move { client.create_lobby("my lobby").await }
    });
    session
        .expect_line("PRIVMSG BanchoBot :!mp make my lobby")
        .await;
    session
        .send(&format!(
            ":BanchoBot!cho@ppy.sh PRIVMSG {TEST_NICK} :Created the tournament match https://osu.ppy.sh/mp/42 my lobby"
        ))
        .await;

    let channel = creating.await.expect("create task").expect("lobby created");
    assert_eq!(channel.name(), "#mp_42");
    assert_eq!(channel.lobby().map(|lobby| lobby.id()), Some(42));
}

#[tokio::test]
async fn test_create_lobby_times_out() {
    let gateway = FakeGateway::bind().await;
    let config = gateway
        .config()
        .with_lobby_creation_timeout(Duration::from_millis(100));
    let client = Client::with_stats(config, FakeStats::new().into_arc());
    let _session = connect(&client, &gateway).await;

    let result = client.create_lobby("silent").await;
    assert!(matches!(result, Err(ClientError::Timeout(_))));
}
