//! # AO Process Host
//!
//! Drives one [`ao_actors::Process`] over line-delimited JSON: every
//! non-empty input line is a raw message, every output line is the response
//! to it. Logs go to stderr so stdout carries nothing but responses.

pub mod logging;
pub mod session;

pub use logging::init_logging;
pub use session::{run_session, SessionSummary};
