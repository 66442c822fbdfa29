// mmp-api: Async Rust client for the Maker Management Platform backend (REST + SSE)

pub mod client;
pub mod error;
pub mod models;
pub mod sse;
pub mod transport;

pub use client::ApiClient;
pub use error::Error;
pub use models::{Asset, AssetPage, NodeKind, Tag};
pub use sse::{RawEvent, StreamEvent, open_event_stream};
pub use transport::{TlsMode, TransportConfig};
