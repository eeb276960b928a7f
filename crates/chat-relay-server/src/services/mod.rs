pub mod chat_service;
pub mod contact_service;
pub mod conversation;
pub mod platform;

pub use chat_service::ChatService;
pub use contact_service::ContactService;
pub use conversation::{ConversationGateway, MessageCache, ResponseWaiter};
pub use platform::{ChatPlatform, UpstreamClient};
