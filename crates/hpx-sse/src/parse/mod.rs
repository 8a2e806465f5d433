//! Incremental SSE decoding.
//!
//! Bytes flow through two stages, each a plain state struct that is only ever
//! driven from one task at a time:
//!
//! ```text
//! chunk ──► LineDecoder::append ──► lines ──► EventAssembler::parse ──► drain()
//! ```
//!
//! [`Pipeline`] bundles both stages so a connection can reset them together.

pub(crate) mod constants;
pub mod assembler;
pub mod event;
pub mod line_decoder;
pub mod pipeline;

pub use assembler::EventAssembler;
pub use event::{MessageEvent, ParsedItem};
pub use line_decoder::LineDecoder;
pub use pipeline::Pipeline;
