//! Fixed-width `KEY = VALUE` text records (main and secondary product headers)

use std::collections::BTreeMap;
use std::io::{Read, Write};

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{FieldError, FormatError};
use crate::Result;

/// Field count of the main product header record
pub const MAIN_HEADER_FIELD_COUNT: usize = 72;

/// Field count of the secondary product header record
pub const SECONDARY_HEADER_FIELD_COUNT: usize = 3;

/// Width of the key column
pub const ASCII_KEY_WIDTH: usize = 30;

/// Column where the value starts (after the `= ` separator)
pub const ASCII_VALUE_START: usize = 32;

const DATE_FORMAT: &str = "%Y%m%d%H%M%SZ";
const LONG_DATE_FORMAT: &str = "%Y%m%d%H%M%S%3fZ";

/// Decoded ASCII header record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsciiRecord {
    fields: BTreeMap<String, String>,
    order: Vec<String>,
}

impl AsciiRecord {
    /// Read `field_count` lines from a record body of `body_size` bytes
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the body cannot be read and
    /// `TruncatedAsciiRecord` if it has fewer lines than required
    pub fn read_from<R: Read>(reader: &mut R, body_size: u64, field_count: usize) -> Result<Self> {
        let mut body = Vec::new();
        reader.take(body_size).read_to_end(&mut body)?;
        if (body.len() as u64) < body_size {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }

        Ok(Self::parse(&body, field_count)?)
    }

    /// Parse `field_count` newline-terminated lines
    ///
    /// # Errors
    ///
    /// Returns `TruncatedAsciiRecord` if fewer lines are present
    pub fn parse(body: &[u8], field_count: usize) -> std::result::Result<Self, FormatError> {
        let mut record = Self::default();
        let mut lines = body.split_inclusive(|&b| b == b'\n');

        for found in 0..field_count {
            let Some(line) = lines.next().and_then(|line| line.strip_suffix(b"\n")) else {
                return Err(FormatError::TruncatedAsciiRecord {
                    expected: field_count,
                    found,
                });
            };

            let (key, value) = split_line(line);
            record.insert(key, value);
        }

        Ok(record)
    }

    /// Insert a field; keeps the first-seen position for an existing key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.fields.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.fields.insert(key, value.into());
    }

    /// Encode the record body, one line per field
    ///
    /// # Errors
    ///
    /// Returns error if the writer fails
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (key, value) in self.iter() {
            writeln!(writer, "{key:<ASCII_KEY_WIDTH$}= {value}")?;
        }
        Ok(())
    }

    /// Encoded size of the body in bytes
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.iter()
            .map(|(key, value)| key.len().max(ASCII_KEY_WIDTH) + 2 + value.len() + 1)
            .sum()
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the record has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Fields in record order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|key| self.fields.get(key).map(|value| (key.as_str(), value.as_str())))
    }

    /// Whether the key is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Raw string value
    ///
    /// # Errors
    ///
    /// Returns `FieldError::Missing` if the key is absent
    pub fn get_str(&self, key: &str) -> std::result::Result<&str, FieldError> {
        self.fields
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| FieldError::Missing(key.to_string()))
    }

    /// Integer value
    ///
    /// # Errors
    ///
    /// Returns `Missing` or `NotAnInteger`
    pub fn get_int(&self, key: &str) -> std::result::Result<i32, FieldError> {
        let value = self.get_str(key)?;
        parse_signed(value).ok_or_else(|| FieldError::NotAnInteger {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Long integer value
    ///
    /// # Errors
    ///
    /// Returns `Missing` or `NotAnInteger`
    pub fn get_long(&self, key: &str) -> std::result::Result<i64, FieldError> {
        let value = self.get_str(key)?;
        parse_signed(value).ok_or_else(|| FieldError::NotAnInteger {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Floating point value
    ///
    /// # Errors
    ///
    /// Returns `Missing` or `NotAFloat`
    pub fn get_float(&self, key: &str) -> std::result::Result<f64, FieldError> {
        let value = self.get_str(key)?;
        value.parse::<f64>().map_err(|_| FieldError::NotAFloat {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Date value in `yyyyMMddHHmmssZ` or `yyyyMMddHHmmssSSSZ` form
    ///
    /// # Errors
    ///
    /// Returns `Missing` or `NotADate`
    pub fn get_date(&self, key: &str) -> std::result::Result<DateTime<Utc>, FieldError> {
        let value = self.get_str(key)?;
        NaiveDateTime::parse_from_str(value, DATE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(value, LONG_DATE_FORMAT))
            .map(|naive| naive.and_utc())
            .map_err(|_| FieldError::NotADate {
                key: key.to_string(),
                value: value.to_string(),
            })
    }
}

/// EPS integers carry an explicit sign (`+0001`)
fn parse_signed<T: std::str::FromStr>(value: &str) -> Option<T> {
    let value = value.strip_prefix('+').unwrap_or(value);
    value.parse::<T>().ok()
}

fn split_line(line: &[u8]) -> (String, String) {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let key_end = line.len().min(ASCII_KEY_WIDTH);
    let key = String::from_utf8_lossy(&line[..key_end]).trim().to_string();
    let value = if line.len() > ASCII_VALUE_START {
        String::from_utf8_lossy(&line[ASCII_VALUE_START..])
            .trim()
            .to_string()
    } else {
        String::new()
    };
    (key, value)
}
