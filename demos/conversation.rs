use std::time::Duration;
use treesindia_realtime::{EnvToken, RealtimeChannel};

/// Join one chat room and print its traffic for a minute.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let base_url = std::env::var("TREESINDIA_API_URL")
        .unwrap_or_else(|_| "http://localhost:8080".to_string());
    let room: u64 = std::env::var("TREESINDIA_ROOM_ID")
        .expect("TREESINDIA_ROOM_ID must be set in .env")
        .parse()?;

    let channel = RealtimeChannel::conversation(&base_url, room, EnvToken::default())?;

    channel.on_conversation_message(|m| {
        println!(
            "💬 {} [{}] {}: {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            m.conversation_id,
            m.message.sender_id.map_or("?".to_string(), |id| id.to_string()),
            m.message.message.as_deref().unwrap_or("")
        );
    });
    channel.on_conversation_status(|s| println!("ℹ️  room {} is {:?}", s.conversation_id, s.status));
    channel.on_conversation_unread_count(|c| {
        println!("📬 room {}: {} unread", c.conversation_id, c.unread_count)
    });
    channel.on_pong(|ts| println!("🏓 pong {:?}", ts));

    channel.set_enabled(true).await?;
    println!("✅ Joined room {}\n", room);

    let mut states = channel.watch_state();
    let watcher = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            println!("🔌 state: {:?}", *states.borrow());
        }
    });

    tokio::time::sleep(Duration::from_secs(60)).await;

    channel.shutdown().await;
    watcher.abort();
    println!("👋 Left room {}", room);

    Ok(())
}
