use std::sync::Arc;
use std::time::Instant;
use axum::extract::FromRef;

use crate::config::Settings;
use crate::services::{ChatService, ContactService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
    pub contact_service: Arc<ContactService>,
    pub settings: Arc<Settings>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        chat_service: Arc<ChatService>,
        contact_service: Arc<ContactService>,
        settings: Settings,
    ) -> Self {
        Self {
            chat_service,
            contact_service,
            settings: Arc::new(settings),
            started_at: Instant::now(),
        }
    }
}

impl FromRef<AppState> for Arc<ChatService> {
    fn from_ref(state: &AppState) -> Self {
        state.chat_service.clone()
    }
}

impl FromRef<AppState> for Arc<ContactService> {
    fn from_ref(state: &AppState) -> Self {
        state.contact_service.clone()
    }
}
