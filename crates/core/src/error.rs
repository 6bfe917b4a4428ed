use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("fetching {location} returned {status}")]
    Fetch { location: String, status: String },

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum RankError {
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("comparison feature `{feature}` has zero variance across the pool")]
    DegenerateFeature { feature: &'static str },

    #[error("not enough comparable properties found: {0}")]
    InsufficientData(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Rank(#[from] RankError),

    #[error("no held-out property with id {0}")]
    UnknownQuery(String),
}

pub type Result<T, E = RankError> = std::result::Result<T, E>;
