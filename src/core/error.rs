use thiserror::Error;

/// Outcome classification for a single record delivery to the relay.
///
/// The caller never retries within a tick; an admitted record whose delivery
/// fails is lost (logged at warn by the pipeline).
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("relay rejected credentials")]
    Unauthorized,
    #[error("relay rejected record with status {0}")]
    Rejected(u16),
    #[error("network failure delivering record: {0}")]
    Network(#[from] reqwest::Error),
}
