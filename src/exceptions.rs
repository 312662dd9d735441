use thiserror::Error;

/// Root error for the stagelink messaging core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Link service is not running")]
    ServiceStopped,

    #[error("Link service is already running")]
    AlreadyRunning,
}

impl From<DictError> for LinkError {
    fn from(err: DictError) -> Self {
        LinkError::Wire(WireError::Dictionary(err))
    }
}

/// Errors raised while decoding or encoding wire messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("Message for command {command} truncated: needed {needed} bytes, {available} available")]
    Truncated {
        command: u16,
        needed: usize,
        available: usize,
    },

    #[error("Text field of command {command} is not valid UTF-8")]
    InvalidText { command: u16 },

    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: i16, height: i16 },

    #[error("Message carries no payload under key 0")]
    MissingPayload,

    #[error("Payload of {len} bytes for command {command} exceeds the u16 length field")]
    PayloadTooLarge { command: u16, len: usize },

    #[error("{count} accel samples exceed the {max} a message can carry")]
    TooManySamples { count: usize, max: usize },

    #[error("Dictionary error: {0}")]
    Dictionary(#[from] DictError),
}

/// Errors of the key/value dictionary layout
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DictError {
    #[error("Dictionary truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("Unknown tuple type {0}")]
    UnknownType(u8),

    #[error("Too many entries for one dictionary")]
    TooManyEntries,

    #[error("Value of {0} bytes does not fit one entry")]
    ValueTooLong(usize),
}

/// Results reported by the channel adapter
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Outbox is busy")]
    Busy,

    #[error("Peer is not connected")]
    NotConnected,

    #[error("Message exceeds the channel buffer")]
    BufferOverflow,

    #[error("Channel is closed")]
    Closed,
}

impl ChannelError {
    /// Whether a later attempt may succeed without any action from the peer.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChannelError::Busy | ChannelError::NotConnected)
    }
}

/// Errors of the outbound delivery queue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Could not allocate outbound buffer")]
    Allocation,

    #[error("Message of {size} bytes exceeds outbound capacity {capacity}")]
    TooLarge { size: usize, capacity: usize },
}

/// Convenient Result type for stagelink
pub type Result<T> = std::result::Result<T, LinkError>;
