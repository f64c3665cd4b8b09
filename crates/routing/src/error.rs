use opsdesk_common::RecipientId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The primary response of an event could not be delivered. Per-copy
    /// fan-out failures are logged at the delivery boundary instead and
    /// never surface here.
    #[error("delivery to {recipient} failed: {source}")]
    Delivery {
        recipient: RecipientId,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
