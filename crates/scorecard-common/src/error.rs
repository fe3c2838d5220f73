/// Error types shared by the scorecard crates.
///
/// These errors represent failures while fetching or decoding the static data files and
/// while talking to read-only upstream services. Server-specific errors are defined in the
/// server crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("data file {name} unavailable: status={status}")]
    SourceStatus { name: String, status: u16 },

    #[error("csv error in {name}: {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    #[error("missing required column {column} in {name}")]
    MissingColumn { name: String, column: String },

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} body={body}")]
    Upstream { status: u16, body: String },
}
