//! Error types for metop-avhrr

use std::io;
use thiserror::Error;

use crate::format::{InstrumentGroup, RecordClass};

/// Result type for metop-avhrr operations
pub type Result<T> = std::result::Result<T, MetopError>;

/// Errors that can occur while opening or reading a product
#[derive(Debug, Error)]
pub enum MetopError {
    /// I/O error on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or unsupported product structure
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// ASCII header value present but semantically invalid (or absent)
    #[error("Header field error: {0}")]
    Field(#[from] FieldError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Caller asked for something the product cannot provide
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Structural errors in the record chain. Always fatal at open time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Record class byte does not map to a known class
    #[error("invalid record class {0}")]
    InvalidRecordClass(u8),

    /// Instrument group byte does not map to a known group
    #[error("invalid instrument group {0}")]
    InvalidInstrumentGroup(u8),

    /// A header record has the wrong class, group or subclass
    #[error("unsupported product: bad {record}. RecordClass={class:?} InstrumentGroup={group:?} RecordSubclass={subclass}")]
    UnsupportedProduct {
        /// Which record was being validated (`MPHR`, `SPHR`, `MDR`)
        record: &'static str,
        /// Class found in the header
        class: RecordClass,
        /// Instrument group found in the header
        group: InstrumentGroup,
        /// Subclass found in the header
        subclass: u8,
    },

    /// The main header declares more (or fewer) than one secondary header
    #[error("unsupported product: TOTAL_SPHR is {0}, expected 1")]
    SecondaryHeaderCount(i64),

    /// Earth views per scan line differs from the fixed raster width
    #[error("unsupported product: EARTH_VIEWS_PER_SCANLINE is not {expected}. Actual value: {actual}")]
    UnexpectedEarthViews {
        /// Width every supported product has
        expected: u32,
        /// Width found in the secondary header
        actual: i64,
    },

    /// Navigation sample rate is neither 20 nor 40
    #[error("unsupported product: NAV_SAMPLE_RATE is {0}")]
    UnsupportedSampleRate(i64),

    /// An entry of the pointer table is not a generic IPR
    #[error("bad internal pointer record: RecordClass={class:?} InstrumentGroup={group:?} size={size}")]
    InvalidPointerRecord {
        /// Class found where an IPR was expected
        class: RecordClass,
        /// Instrument group found where GENERIC was expected
        group: InstrumentGroup,
        /// Declared record size
        size: u32,
    },

    /// The pointer table ended without a pointer to the bulk records
    #[error("pointer table has no entry for the measurement data records")]
    MissingBulkRecordPointer,

    /// The radiance calibration record header is unreadable
    #[error("invalid calibration record: {0}")]
    InvalidCalibrationRecord(String),

    /// An ASCII header record has fewer lines than its kind requires
    #[error("ASCII record truncated: expected {expected} fields, found {found}")]
    TruncatedAsciiRecord {
        /// Field count the record kind requires
        expected: usize,
        /// Lines actually present
        found: usize,
    },

    /// Record declares a size smaller than its own header
    #[error("record at offset {offset} declares size {size}")]
    InvalidRecordSize {
        /// Absolute offset of the record
        offset: u64,
        /// Declared size
        size: u32,
    },

    /// Not a single complete scan line survives the height correction
    #[error("no complete scan lines: {available} available, navigation sample rate {sample_rate}")]
    NoCompleteScanLines {
        /// Scan lines found before correction
        available: i64,
        /// Navigation sample rate
        sample_rate: u32,
    },
}

/// Typed-accessor errors for ASCII header values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Key not present in the record
    #[error("missing header field '{0}'")]
    Missing(String),

    /// Value is not an integer
    #[error("header field '{key}' is not an integer: '{value}'")]
    NotAnInteger {
        /// Field key
        key: String,
        /// Raw value
        value: String,
    },

    /// Value is not a floating point number
    #[error("header field '{key}' is not a number: '{value}'")]
    NotAFloat {
        /// Field key
        key: String,
        /// Raw value
        value: String,
    },

    /// Value is not a date in one of the header formats
    #[error("header field '{key}' is not a date: '{value}'")]
    NotADate {
        /// Field key
        key: String,
        /// Raw value
        value: String,
    },
}
