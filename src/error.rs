use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Reserved character in token: {0}")]
    ReservedCharacter(String),
    #[error("Parse error in {option} option: {message}")]
    Parse { option: &'static str, message: String },
    #[error("Unable to merge duplicate {option} options: {first} and {second}")]
    Merge { option: &'static str, first: String, second: String },
    #[error("Matcher has no predicates")]
    EmptyMatcher,
    #[error("No search buckets given")]
    NoBuckets,
    #[error("Hand-off to the authoritative lane failed: {0}")]
    Handoff(String),
    #[error("Host error: {0}")]
    Host(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl SearchError {
    pub fn parse(option: &'static str, message: impl Into<String>) -> Self {
        Self::Parse { option, message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

// Helper conversions
impl From<::config::ConfigError> for SearchError {
    fn from(e: ::config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
