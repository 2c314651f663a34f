#[path = "engine/support.rs"]
mod support;

#[path = "gateway/chat_routes.rs"]
mod chat_routes;
