//! Channel error types.

use thiserror::Error;

/// Channel error type.
///
/// Messages follow the extension runtime's wording so that they read the
/// same when surfaced to the popup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// No listener in another context accepted the message
    #[error("Could not establish connection. Receiving end does not exist.")]
    NoReceiver,

    /// Every receiver dropped its responder without answering
    #[error("The message port closed before a response was received.")]
    PortClosed,

    /// The request was already answered through another responder
    #[error("Reply already sent for this request")]
    AlreadyAnswered,

    /// The requester stopped waiting before the reply arrived
    #[error("Requester is no longer waiting for a reply")]
    RequesterGone,

    /// The embedded frame cannot accept messages
    #[error("Frame unavailable: {0}")]
    FrameUnavailable(String),
}

/// Result type alias using ChannelError.
pub type ChannelResult<T> = Result<T, ChannelError>;
