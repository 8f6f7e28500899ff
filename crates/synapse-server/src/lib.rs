pub mod bridge;
pub mod catalog;
pub mod http;
pub mod rpc;
pub mod server;
pub mod session;

pub use bridge::{Bridge, BridgeError};
pub use http::{build_http_router, start_http, HttpHandle, HttpState};
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
pub use session::{Session, SessionRegistry};
