use std::fmt::{Display, Formatter};

// Error
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    // Reed-Solomon codec
    InvalidLength,
    TooManyErrors,
    DataTooLong,

    // Chunk framer
    ShortBuffer,
    ChecksumMismatch,
    Metadata(String),
    Io(String),

    // Grid codec & locator
    GridOverflow,
    NoGridDetected,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::InvalidLength => f.write_str("Received block shorter than codec data size"),
            Self::TooManyErrors => f.write_str("Too many errors to correct successfully"),
            Self::DataTooLong => f.write_str("Data exceeds codec capacity"),
            Self::ShortBuffer => f.write_str("Frame shorter than required"),
            Self::ChecksumMismatch => f.write_str("Checksum does not match payload digest"),
            Self::Metadata(msg) => write!(f, "Metadata frame error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::GridOverflow => f.write_str("Data does not fit the configured grid"),
            Self::NoGridDetected => f.write_str("No color grid detected in frame"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Metadata(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
