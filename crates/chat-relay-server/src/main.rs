use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use chat_relay_server::{
    build_router,
    config::Settings,
    services::{
        ChatService, ContactService, ConversationGateway, MessageCache, ResponseWaiter,
        UpstreamClient,
    },
    telemetry::init_telemetry,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    let _log_guard = init_telemetry(&settings.logging);

    info!("🚀 Starting chat relay server...");
    info!("✅ Configuration loaded");

    // Initialize services
    let platform = Arc::new(UpstreamClient::new(&settings.chat_api)?);
    let cache = MessageCache::new(settings.cache.ttl());
    let gateway = Arc::new(ConversationGateway::new(platform, cache));
    let waiter = ResponseWaiter::new(gateway.clone(), settings.reply_polling.clone());
    let chat_service = Arc::new(ChatService::new(gateway, waiter));
    info!("✅ Chat platform client ready (cache ttl: {:?})", settings.cache.ttl());

    let contact_service = Arc::new(ContactService::new(settings.contact.clone())?);
    if !contact_service.is_configured() {
        warn!("Contact relay access key missing, /api/contact will answer 503");
    }

    let addr: SocketAddr = settings.bind_address().parse()?;
    let app = build_router(AppState::new(chat_service, contact_service, settings));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
