use thiserror::Error;

#[derive(Debug, Error)]
pub enum Robd2Error {
    #[error("Specification table is invalid: {0}")]
    InvalidSpecTable(String),

    #[error("Specification table is not strictly ascending: {previous} ft is followed by {next} ft")]
    SpecOrdering { previous: i32, next: i32 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to parse YAML from '{0}': {1}")]
    YamlParsing(String, #[source] serde_yaml::Error),

    #[error("Failed to serialize JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Failed to process CSV file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),

    #[error("The {0} worker thread panicked")]
    WorkerPanicked(&'static str),
}
