//! HTTP middleware: request ID and access logging.

pub mod access_log;
pub mod request_id;
