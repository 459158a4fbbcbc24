//! `!stats` lookups answered by the scripted bot.

use super::*;
use crate::{Client, ClientError};

async fn answer_stats(session: &mut GatewaySession) -> String {
    let line = session.expect_line("PRIVMSG BanchoBot :!stats ").await;
    let name = line.trim_start_matches("PRIVMSG BanchoBot :!stats ").to_string();
    if name == "alice" {
        for reply in [
            "Stats for (alice)[https://osu.ppy.sh/u/5] is Idle:",
            "Score:    1,234,567 (#10)",
            "Plays:    321 (lv42)",
            "Accuracy: 98.5%",
        ] {
            session
                .send(&format!(":BanchoBot!cho@ppy.sh PRIVMSG {TEST_NICK} :{reply}"))
                .await;
        }
    } else {
        session
            .send(&format!(":BanchoBot!cho@ppy.sh PRIVMSG {TEST_NICK} :User not found"))
            .await;
    }
    name
}

#[tokio::test]
async fn test_stats_lookup_parses_answer() {
    let gateway = FakeGateway::bind().await;
    let client = Client::new(gateway.config());
    let mut session = connect(&client, &gateway).await;

    let lookup = tokio::spawn({
        let alice = client.user("alice");
        async move { alice.stats().await }
    });
    assert_eq!(answer_stats(&mut session).await, "alice");

    let stats = lookup.await.expect("stats task").expect("stats found");
    assert!(stats.online);
    assert_eq!(stats.status.as_deref(), Some("Idle"));
    assert_eq!(stats.ranked_score, Some(1_234_567));
    assert_eq!(stats.rank, Some(10));
    assert_eq!(stats.level, Some(42));
    assert_eq!(stats.accuracy, Some(98.5));
    assert_eq!(client.user("alice").id(), Some(5));
}

#[tokio::test]
async fn test_concurrent_lookups_keep_their_own_answers() {
    let gateway = FakeGateway::bind().await;
    let client = Client::new(gateway.config());
    let mut session = connect(&client, &gateway).await;

    let alice = tokio::spawn({
        let alice = client.user("alice");
        async move { alice.stats().await }
    });
    let ghost = tokio::spawn({
        let ghost = client.user("ghost");
        async move { ghost.stats().await }
    });

    let mut answered = vec![
        answer_stats(&mut session).await,
        answer_stats(&mut session).await,
    ];
    answered.sort();
    assert_eq!(answered, vec!["alice", "ghost"]);

    let alice = alice.await.expect("alice task").expect("alice found");
    assert_eq!(alice.accuracy, Some(98.5));
    let ghost = ghost.await.expect("ghost task");
    assert!(matches!(ghost, Err(ClientError::UserNotFound(name)) if name == "ghost"));
}
