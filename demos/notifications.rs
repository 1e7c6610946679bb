use std::sync::Arc;
use treesindia_realtime::{
    ChannelEndpoint, ChannelTopic, EnvToken, RealtimeChannel, RealtimeClient,
    RealtimeClientOptions, RestClient, TokenProvider,
};

/// Follow the notification feed of the user whose token is in
/// TREESINDIA_ACCESS_TOKEN, refetching over REST whenever the socket recovers.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "treesindia_realtime=debug".into()),
        )
        .init();

    let base_url = std::env::var("TREESINDIA_API_URL")
        .unwrap_or_else(|_| "http://localhost:8080".to_string());
    let tokens: Arc<dyn TokenProvider> = Arc::new(EnvToken::default());

    println!("📡 Connecting to: {}\n", base_url);

    let endpoint = ChannelEndpoint::new(&base_url, ChannelTopic::Notifications)?;
    let client = RealtimeClient::builder(endpoint)
        .options(RealtimeClientOptions::from_env())
        .shared_token_provider(Arc::clone(&tokens))
        .build()?;
    let channel = RealtimeChannel::new(client);
    let rest = RestClient::new(&base_url, tokens)?;

    channel.on_new_notification(|n| {
        println!(
            "🔔 #{} {}",
            n.id,
            n.title.as_deref().unwrap_or("(untitled)")
        );
    });
    channel.on_unread_count_update(|count| println!("📬 {} unread", count));
    channel.on_notification_read(|id| println!("✅ #{} read", id));
    channel.on_all_notifications_read(|_| println!("✅ all read"));
    channel.on_error(|message| eprintln!("⚠️  server error: {}", message));
    channel.on_connection_error(|failure| eprintln!("❌ channel gave up: {}", failure));

    let resync = rest.clone();
    channel.on_reconnected(move |_| {
        let rest = resync.clone();
        tokio::spawn(async move {
            match rest.unread_count().await {
                Ok(count) => println!("🔄 resynced, {} unread", count),
                Err(e) => eprintln!("resync failed: {}", e),
            }
        });
    });

    let page = rest.notifications(1, 10).await?;
    println!(
        "📄 {} of {} notifications loaded over REST\n",
        page.data.len(),
        page.pagination.total
    );

    channel.set_enabled(true).await?;
    println!("✅ Listening, press Ctrl+C to stop\n");

    tokio::signal::ctrl_c().await?;

    println!("Disconnecting...");
    channel.shutdown().await;
    println!("Disconnected!");

    Ok(())
}
