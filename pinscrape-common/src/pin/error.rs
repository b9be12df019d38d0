use thiserror::Error;

/// Problems found while mapping a single raw entry.
///
/// These never abort a page: the extractor logs them and either skips the entry
/// (missing or malformed mandatory field) or keeps it with a fallback value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    #[error("Entry is missing an essential field {field}")]
    MissingField { field: &'static str },

    #[error("Entry field {field} has an unusable value: {value}")]
    MalformedField { field: &'static str, value: String },

    #[error("Failed to parse timestamp {raw:?}")]
    DateParse { raw: String },
}
