#[derive(Debug, Clone, thiserror::Error)]
pub enum InternalError {
    #[error("session channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}
