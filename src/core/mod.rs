pub mod chat_stream;
pub mod config;
pub mod credentials;
pub mod gateway;
pub mod session;
