use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttrParseError {
    #[error("invalid community value: {0}")]
    Community(String),

    #[error("invalid extended community value: {0}")]
    ExtCommunity(String),

    #[error("invalid large community value: {0}")]
    LargeCommunity(String),

    #[error("invalid AS number: {0}")]
    Asn(String),

    #[error("unknown origin: {0}")]
    Origin(String),

    #[error("empty value")]
    Empty,
}
