//! # hpx-sse
//!
//! Client-side Server-Sent Events: an incremental decoder for the
//! `text/event-stream` wire format plus a reconnecting connection controller.
//!
//! - **Chunk-safe decoding**: byte chunks may split lines and multi-byte
//!   characters anywhere; [`LineDecoder`](parse::LineDecoder) reassembles them.
//! - **SSE grammar**: [`EventAssembler`](parse::EventAssembler) handles
//!   `event`/`data`/`id`/`retry` fields, comments and blank-line dispatch.
//! - **Connection lifecycle**: [`EventSource`] drives
//!   `Idle → Connecting → Open → (Reconnecting) → Closed`, resends
//!   `Last-Event-ID` on reconnection, and can be closed at any time.
//! - **Pluggable transport**: [`HttpTransport`] (reqwest) by default, or any
//!   [`SseTransport`] implementation.
//!
//! # Architecture
//!
//! ```text
//! EventSource::connect()
//!   └─ spawns driver task ──► SseTransport::open(SseRequest)
//!                                  │ body chunks
//!                                  ▼
//!                        LineDecoder ─► EventAssembler ─► drain()
//!                                                            │
//!          SseHandler ◄── on_open / on_message / on_comment ─┘
//!                     ◄── on_error / on_complete
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hpx_sse::{EventSource, SseConfig, handlers::ChannelHandler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SseConfig::new("https://api.example.com/v1/stream")
//!     .method(http::Method::GET)
//!     .retry_on_disconnect(true);
//!
//! let (handler, mut stream) = ChannelHandler::new();
//! let source = EventSource::new(config, &handler)?;
//! source.connect();
//!
//! while let Some(notification) = stream.next_notification().await {
//!     println!("{notification:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Module Index
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | [`SseConfig`] builder for connection settings |
//! | [`connection`] | [`EventSource`], [`ConnectionState`] |
//! | `handler` | [`SseHandler`] trait |
//! | [`handlers`] | Ready-to-use handlers ([`ChannelHandler`](handlers::ChannelHandler)) |
//! | [`parse`] | Line decoder, event assembler and [`MessageEvent`] |
//! | [`transport`] | [`SseTransport`] trait and [`HttpTransport`] |

mod config;
pub mod connection;
pub mod error;
mod handler;
pub mod handlers;
pub mod parse;
pub mod transport;

pub use config::SseConfig;
pub use connection::{ConnectionState, EventSource};
pub use error::{SseError, SseResult};
pub use handler::SseHandler;
pub use parse::{MessageEvent, ParsedItem};
pub use transport::{ByteStream, HttpTransport, SseRequest, SseTransport};
