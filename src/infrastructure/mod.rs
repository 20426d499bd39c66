pub mod http;
pub mod server;

pub use server::{router, start_server, ServerConfig};
