pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Algorithm(#[from] sirenia::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("DOT parse error at byte {offset}: {message}")]
    DotParse { offset: usize, message: String },

    #[error("plain output parse error on line {line}: {message}")]
    PlainParse { line: usize, message: String },

    #[error("{program} failed: {message}")]
    Graphviz { program: String, message: String },

    #[error("DOT input needs {needed} bytes but total_memory is {limit}")]
    MemoryExceeded { needed: usize, limit: usize },

    #[error("invalid layout: {message}")]
    InvalidLayout { message: String },

    #[error("a previous graph is required to {action}")]
    MissingPreviousGraph { action: &'static str },

    #[error("new vertices {vertices:?} are not connected to any positioned vertex")]
    UnanchoredCohort { vertices: Vec<String> },

    #[error("grafting only supports top-to-bottom layouts, got rankdir={rankdir}")]
    UnsupportedDirection { rankdir: sirenia::RankDir },

    #[error("anchor {key} is missing from its graft layout")]
    LostAnchor { key: String },

    #[error("edge {from} -> {to} references a vertex that is not in the layout")]
    MissingEdgeEndpoint { from: String, to: String },

    #[error("the layout worker is no longer running")]
    WorkerGone,
}
