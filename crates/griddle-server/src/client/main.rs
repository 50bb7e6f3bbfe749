//! Demo producer: replays a fixed ingredient script against a running kitchen
//! and prints every message the kitchen sends back.

use anyhow::Context;
use clap::Parser;
use core::time::Duration;
use futures::{SinkExt, StreamExt};
use griddle_core::{codec, types::Ingredient};
use griddle_server::server::telemetry::init_telemetry;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "griddle-client",
    version,
    about = "Sends a demo run of ingredients to a griddle kitchen"
)]
struct ClientArgs {
    /// Kitchen to connect to.
    ///
    /// Environment variable: `SERVER_URL`
    #[arg(long, env = "SERVER_URL", default_value = "ws://localhost:8080")]
    server_url: String,

    /// Pause, in milliseconds, after the first round of ingredients. The
    /// client waits twice as long after the second round before closing.
    ///
    /// Environment variable: `PAUSE_MS`
    #[arg(long, env = "PAUSE_MS", default_value_t = 5_000)]
    pause_ms: u64,
}

const FIRST_ROUND: [Ingredient; 4] = [
    Ingredient::flour(100),
    Ingredient::flour(450),
    Ingredient::eggs(4),
    Ingredient::milk(1.5),
];

const SECOND_ROUND: [Ingredient; 3] = [
    Ingredient::eggs(2),
    Ingredient::flour(300),
    Ingredient::milk(1.5),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = ClientArgs::parse();
    let providers = init_telemetry()?;

    let result = run(&args).await;
    providers.shutdown();
    result
}

async fn run(args: &ClientArgs) -> anyhow::Result<()> {
    let pause = Duration::from_millis(args.pause_ms);

    let (socket, _) = connect_async(args.server_url.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", args.server_url))?;
    tracing::info!("Connected to {}", args.server_url);

    let (mut write, mut read) = socket.split();

    let reader = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => println!("{}", text.as_str()),
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("Connection ended: {e}");
                    break;
                }
            }
        }
    });

    for (round, wait) in [(&FIRST_ROUND[..], pause), (&SECOND_ROUND[..], pause * 2)] {
        for ingredient in round {
            write
                .send(Message::text(codec::encode(ingredient)))
                .await
                .with_context(|| format!("failed to send {ingredient}"))?;
            tracing::info!("Sent {ingredient}");
        }

        tokio::time::sleep(wait).await;
    }

    write
        .send(Message::Close(None))
        .await
        .context("failed to close the connection")?;

    reader.await.context("reader task failed")?;
    Ok(())
}
