//! Ready-to-use [`SseHandler`](crate::SseHandler) implementations.
//!
//! - [`ChannelHandler`]: forwards notifications into a [`SseStream`]

mod channel;

pub use channel::{ChannelHandler, SseNotification, SseStream};
