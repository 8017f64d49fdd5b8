pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("payload path {path_idx} does not contain the focal node {focal}")]
    MissingFocalNode { path_idx: usize, focal: String },

    #[error("invalid visibility key {key:?}: unexpected character {found:?} at {offset}")]
    InvalidVisibilityKey {
        key: String,
        found: char,
        offset: usize,
    },

    #[error("visibility indices {indices:?} are both added and removed")]
    OverlappingVisibilityDiff { indices: Vec<usize> },

    #[error("visibility index {idx} does not exist")]
    UnknownVisibilityIdx { idx: usize },

    #[error(
        "path element at visibility index {idx} ({key}) was revealed before its focal-side neighbor"
    )]
    MissingFocalSideVertex { idx: usize, key: String },

    #[error("path element at visibility index {idx} ({key}) has no vertex to be removed from")]
    UnknownVertex { idx: usize, key: String },

    #[error("invalid payload JSON: {message}")]
    InvalidPayload { message: String },
}
