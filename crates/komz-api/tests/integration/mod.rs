mod chat;
mod create_web_call;
mod server;
