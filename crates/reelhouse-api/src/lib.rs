// reelhouse-api: Async client for the reelhouse streaming backend (REST + STOMP realtime)

pub mod client;
pub mod error;
pub mod realtime;
pub mod session;
pub mod stomp;
pub mod transport;

pub use client::{ApiClient, ApiRequest, SessionExpiryPolicy};
pub use error::Error;
pub use realtime::{ConnectionState, RealtimeChannel, RealtimeConfig, RealtimeMessage};
pub use session::{MemoryNavigator, MemoryTokenStore, Navigator, Session, TokenStore};
pub use transport::{TlsMode, TransportConfig};
