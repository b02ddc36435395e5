//! Port traits at the seams between domain logic and the outside world.

pub mod config_port;
pub mod digest_port;
pub mod report_port;
pub mod source_port;
