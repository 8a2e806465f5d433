//! Common constants used across the SSE decoder.

/// Newline byte
pub(crate) const LF: u8 = b'\n';
/// Carriage return
pub(crate) const CR: char = '\r';
/// Comment marker at the start of a line
pub(crate) const COLON: char = ':';

/// Byte Order Mark as char
pub(crate) const BOM: char = '\u{FEFF}';

/// Default event type string (`"message"`)
pub(crate) const MESSAGE_TYPE: &str = "message";

pub(crate) const FIELD_EVENT: &str = "event";
pub(crate) const FIELD_DATA: &str = "data";
pub(crate) const FIELD_ID: &str = "id";
pub(crate) const FIELD_RETRY: &str = "retry";
