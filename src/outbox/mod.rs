/// Direct-send accelerometer polling
pub mod accel;
/// Doubling retry delay
pub mod backoff;
/// Ordered delivery queue
pub mod queue;

pub use accel::{AccelPoll, PollStep};
pub use backoff::Backoff;
pub use queue::{DeliveryQueue, Encoding, Flush, QueuedPacket};
