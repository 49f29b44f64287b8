//! # GridWatch Core
//!
//! Pipeline primitives shared by every GridWatch stage: the blocking FIFO
//! channels that couple the workers, the shutdown token the supervisor and
//! signal handler share, and the event types that travel through the
//! pipeline.

pub mod channel;
pub mod events;
pub mod shutdown;

pub use channel::Channel;
pub use events::{ActionEvent, CapturedFrame};
pub use shutdown::ShutdownToken;
