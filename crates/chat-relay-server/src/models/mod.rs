pub mod chat;
pub mod contact;
