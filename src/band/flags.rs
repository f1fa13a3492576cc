//! Per scan line quality flags

use std::io::{Read, Seek};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use super::{fill_window, BandReader, DataType, ReadStatus, Row, Window};
use crate::format::FLAG_OFFSET;
use crate::product::ProductGeometry;
use crate::stream::SharedStream;
use crate::Result;

/// One bit of the flag band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagDefinition {
    /// Flag name
    pub name: &'static str,
    /// Bit mask in the delivered sample
    pub mask: u8,
    /// Description
    pub description: &'static str,
    /// Quality indicator bit this flag is taken from; `None` for the scan
    /// line quality summary
    source_bit: Option<u32>,
}

/// Flag coding of the flag band
pub const FLAG_CODING: [FlagDefinition; 7] = [
    FlagDefinition {
        name: "DO_NOT_USE",
        mask: 0x01,
        description: "Scan line should not be used",
        source_bit: Some(31),
    },
    FlagDefinition {
        name: "TIME_SEQUENCE_ERROR",
        mask: 0x02,
        description: "Time sequence error detected within this scan line",
        source_bit: Some(30),
    },
    FlagDefinition {
        name: "DATA_GAP",
        mask: 0x04,
        description: "Data gap precedes this scan line",
        source_bit: Some(29),
    },
    FlagDefinition {
        name: "INSUFFICIENT_CALIBRATION",
        mask: 0x08,
        description: "Insufficient data for calibration",
        source_bit: Some(28),
    },
    FlagDefinition {
        name: "NO_EARTH_LOCATION",
        mask: 0x10,
        description: "Earth location data not available",
        source_bit: Some(27),
    },
    FlagDefinition {
        name: "CLOCK_UPDATE",
        mask: 0x20,
        description: "First good time following a clock update",
        source_bit: Some(26),
    },
    FlagDefinition {
        name: "SCAN_LINE_QUALITY",
        mask: 0x40,
        description: "Scan line quality indicators are set",
        source_bit: None,
    },
];

/// Collapse the quality indicator and scan line quality words into the
/// delivered flag byte
#[must_use]
pub fn flag_value(quality_indicator: u32, scan_line_quality: u32) -> u8 {
    FLAG_CODING.iter().fold(0, |flags, flag| {
        let set = match flag.source_bit {
            Some(bit) => quality_indicator & (1 << bit) != 0,
            None => scan_line_quality != 0,
        };
        if set {
            flags | flag.mask
        } else {
            flags
        }
    })
}

/// Delivers one flag byte per scan line, repeated across the row
#[derive(Debug, Clone)]
pub struct FlagReader<R> {
    stream: SharedStream<R>,
    geometry: Arc<ProductGeometry>,
}

impl<R> FlagReader<R> {
    pub(crate) fn new(stream: SharedStream<R>, geometry: Arc<ProductGeometry>) -> Self {
        Self { stream, geometry }
    }

    /// Flag coding of the delivered samples
    #[must_use]
    pub fn flag_coding(&self) -> &'static [FlagDefinition] {
        &FLAG_CODING
    }
}

impl<R: Read + Seek> BandReader for FlagReader<R> {
    type Sample = u8;

    fn band_name(&self) -> String {
        "flags".to_string()
    }

    fn unit(&self) -> &str {
        ""
    }

    fn description(&self) -> String {
        "Scan line quality flags".to_string()
    }

    fn scaling_factor(&self) -> f64 {
        1.0
    }

    fn data_type(&self) -> DataType {
        DataType::UInt8
    }

    fn read_window(&self, window: &Window, out: &mut [u8], cancel: &AtomicBool) -> Result<ReadStatus> {
        let geometry = &*self.geometry;
        let mut words = [0u8; 8];
        fill_window(
            geometry,
            window,
            out,
            cancel,
            |raw_y, row| {
                self.stream.read_at(geometry.field_offset(raw_y, FLAG_OFFSET), &mut words)?;
                let value = flag_value(
                    BigEndian::read_u32(&words[..4]),
                    BigEndian::read_u32(&words[4..]),
                );
                row.fill(value);
                Ok(Row::Data)
            },
            |value| value,
            0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value() {
        assert_eq!(flag_value(0, 0), 0);
        assert_eq!(flag_value(0x8000_0000, 0), 0x01);
        assert_eq!(flag_value(0x0400_0000, 0), 0x20);
        assert_eq!(flag_value(0xFC00_0000, 1), 0x7F);
        // bits below the flagged range are ignored
        assert_eq!(flag_value(0x03FF_FFFF, 0), 0);
        assert_eq!(flag_value(0, 0x10), 0x40);
    }

    #[test]
    fn test_masks_distinct() {
        let combined = FLAG_CODING.iter().fold(0u8, |acc, flag| {
            assert_eq!(acc & flag.mask, 0, "{} overlaps", flag.name);
            acc | flag.mask
        });
        assert_eq!(combined, 0x7F);
    }
}
