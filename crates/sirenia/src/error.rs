#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("graph contains an edge with a missing endpoint: {edge_id}")]
    MissingEndpoint { edge_id: String },

    #[error("graph contains the node id {node_id} more than once")]
    DuplicateNode { node_id: String },

    #[error("node {node_id} has an invalid size ({width} x {height})")]
    InvalidNodeSize {
        node_id: String,
        width: f64,
        height: f64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
