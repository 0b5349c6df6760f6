//! HTTP surface: routes, handlers, and the serving loop.

mod handlers;
mod server;

pub use handlers::{router, AppState};
pub use server::HttpServer;
