use clarity_client::LimsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClarityError {
    /// A history walk could not fetch an entity it needed. The walk is
    /// all-or-nothing, so this aborts the whole call.
    #[error("fetch failed for {uri}")]
    Fetch {
        uri: String,
        #[source]
        source: LimsError,
    },

    #[error("step history walk from {uri} exceeded {hops} hops")]
    HistoryDepthExceeded { uri: String, hops: usize },

    #[error("sample {uri} has no artifact")]
    SampleWithoutArtifact { uri: String },

    #[error(transparent)]
    Lims(#[from] LimsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ClarityError>;
