use realtime_resilience::{
    ConnectionListener, ConnectionManager, ConnectionState, LinkType, ManualConnectivityProbe,
    NetworkCapabilities, NetworkEvent, NetworkQuality, RoomKind, StaticAddressResolver,
    StaticTokenProvider, WebSocketTransport,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

struct PrintingListener;

impl ConnectionListener for PrintingListener {
    fn on_network_lost(&self) {
        println!("📴 Network lost");
    }

    fn on_reconnected(&self) {
        println!("✅ Reconnected");
    }

    fn on_network_type_changed(&self, link_type: LinkType) {
        println!("🔀 Network type: {:?}", link_type);
    }

    fn on_network_quality_changed(&self, quality: NetworkQuality) {
        println!("📶 Network quality: {:?}", quality);
    }

    fn on_reconnection_failed(&self, attempts: u32) {
        println!("❌ Gave up after {} attempts (will retry later)", attempts);
    }

    fn on_retrying(&self, attempt: u32, delay: Duration) {
        println!("🔁 Attempt {} (backoff {:?})", attempt, delay);
    }

    fn on_state_changed(&self, from: ConnectionState, to: ConnectionState) {
        println!("   {} -> {}", from, to);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    // Initialize tracing to see reconnect and heartbeat logs
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("realtime_resilience=debug")),
        )
        .init();

    println!("🦀 Watching a resilient realtime connection\n");

    let host = std::env::var("REALTIME_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let token = std::env::var("REALTIME_TOKEN").unwrap_or_else(|_| "dev-token".to_string());
    let room = std::env::var("REALTIME_ROOM").unwrap_or_else(|_| "chat_1".to_string());

    let probe = ManualConnectivityProbe::new(Some(NetworkCapabilities::wifi(-55)));
    let manager = ConnectionManager::builder(
        Arc::new(WebSocketTransport::new()),
        Arc::new(StaticAddressResolver::new(host.clone())),
        Arc::new(StaticTokenProvider::new(token)),
        Arc::new(probe.clone()),
    )
    .listener(Arc::new(PrintingListener))
    .build()?;

    println!("📡 Connecting to {}\n", host);
    manager.register()?;
    manager.set_current_room(room, RoomKind::Chat).await?;

    println!("⏳ Waiting 20 seconds to observe heartbeats...");
    tokio::time::sleep(Duration::from_secs(20)).await;

    println!("\n📴 Simulating a network loss...");
    probe.set_active(None);
    manager.notify_network(NetworkEvent::Lost)?;
    tokio::time::sleep(Duration::from_secs(5)).await;

    println!("\n📶 Network back on cellular...");
    let cellular = NetworkCapabilities::cellular(8_000);
    probe.set_active(Some(cellular.clone()));
    manager.notify_network(NetworkEvent::Available(cellular))?;
    tokio::time::sleep(Duration::from_secs(10)).await;

    println!("\n{:#?}", manager.snapshot());

    manager.unregister().await?;
    println!("✅ Unregistered, all timers stopped");

    Ok(())
}
