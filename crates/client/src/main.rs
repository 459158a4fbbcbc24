//! Bancho Client - demo binary.
//!
//! Connects with the credentials from the environment, logs connection
//! changes and private messages, and disconnects on Ctrl-C.

use bancho_client::{Client, ClientConfig, ClientEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bancho_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(
        username = %config.username,
        host = %config.host,
        port = config.port,
        "Starting Bancho client"
    );

    let client = Client::new(config);
    let mut events = client.events().subscribe_channel();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ClientEvent::State { state, error } => match error {
                    Some(error) => tracing::info!(state = ?state, error = %error, "Connection state"),
                    None => tracing::info!(state = ?state, "Connection state"),
                },
                ClientEvent::PrivateMessage(message) if !message.self_sent => {
                    tracing::info!(from = %message.sender.name(), "{}", message.content);
                }
                ClientEvent::Error(error) => tracing::warn!(error = %error, "Background error"),
                _ => {}
            }
        }
    });

    client.connect().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    client.disconnect();

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
