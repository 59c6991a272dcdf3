use wireplot_frame::MessageKind;

/// Errors that can occur in peer operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] wireplot_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] wireplot_frame::FrameError),

    /// Motion failure on the plotter side.
    #[error("motion error: {0}")]
    Motion(#[from] wireplot_motion::MotionError),

    /// The plotter answered with an `Error` message.
    #[error("rejected by plotter: {0}")]
    Rejected(String),

    /// The plotter answered with something other than `Ok` or `Error`.
    #[error("unexpected {0} reply")]
    UnexpectedReply(MessageKind),

    /// A path stopped at the first waypoint the plotter refused.
    #[error("path stopped at waypoint {index}: {source}")]
    PathRejected {
        index: usize,
        #[source]
        source: Box<PeerError>,
    },
}

pub type Result<T> = std::result::Result<T, PeerError>;
