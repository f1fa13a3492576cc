//! On-disk record structures of an EPS Level-1B product

mod ascii;
mod giadr;
mod header;
mod mphr;
mod pointer;
pub mod writer;

pub use ascii::{
    AsciiRecord, MAIN_HEADER_FIELD_COUNT, SECONDARY_HEADER_FIELD_COUNT, ASCII_KEY_WIDTH,
    ASCII_VALUE_START,
};
pub use giadr::{
    InfraredCoefficients, RadianceCalibration, VisibleCoefficients, GIADR_RADIANCE_SIZE,
    GIADR_RADIANCE_SUBCLASS, IR_TEMPERATURE_SCALE, IR_TEMPERATURE_SETS, IR_TEMPERATURE_TERMS,
};
pub use header::{InstrumentGroup, RecordClass, RecordHeader, Timestamp, RECORD_HEADER_SIZE};
pub use mphr::{FieldGroup, FieldKind, HeaderField, ScaleFactor, MAIN_HEADER_FIELDS};
pub use pointer::{read_pointer_table, AuxiliaryRecords, PointerEntry, FREE_TEXT_SIZE, IPR_SIZE};

use crate::error::FormatError;

/// Raster width every supported product carries per scan line
pub const EXPECTED_PRODUCT_WIDTH: u32 = 2048;

/// Number of scene radiance rows per scan line (3A and 3B share one row)
pub const RADIANCE_ROWS: usize = 5;

/// Offset of the scene radiances within a scan line
pub const SCENE_RADIANCE_OFFSET: u64 = 24;

/// Offset of the navigation angles within a scan line
pub const TIE_POINT_OFFSET: u64 = 20_556;

/// Offset of the quality indicator (high precision layout)
pub const FLAG_OFFSET: u64 = 22_204;

/// Offset of the cloud information (high precision layout)
pub const CLOUD_OFFSET: u64 = 22_472;

/// Offset of the frame indicator (high precision layout)
pub const FRAME_INDICATOR_OFFSET: u64 = 26_580;

/// Bytes removed from every field after the navigation block in
/// low precision products
pub const TIE_POINT_DIFFERENCE: u64 = 832;

/// Scan line size with high precision navigation
pub const HIGH_PRECISION_MDR_SIZE: u32 = 26_660;

/// Scan line size with low precision navigation
pub const LOW_PRECISION_MDR_SIZE: u32 = HIGH_PRECISION_MDR_SIZE - TIE_POINT_DIFFERENCE as u32;

/// Navigation points per line, high precision
pub const HIGH_PRECISION_NAV_POINTS: u32 = 103;

/// Navigation points per line, low precision
pub const LOW_PRECISION_NAV_POINTS: u32 = 51;

/// Bytes of navigation data per navigation point (4 `i16` angles, 2 `i32` coordinates)
pub const NAV_POINT_SIZE: u64 = 16;

/// Subclass of the bulk measurement record
pub const MDR_SUBCLASS: u8 = 2;

/// Frame indicator bit set when channel 3A is active (bit 0 of the second byte)
pub const FRAME_INDICATOR_CHANNEL_3A: u32 = 1 << 16;

/// Offset of a scan line field, moved for low precision navigation when it
/// lies after the navigation block
#[must_use]
pub fn field_offset(high_precision_offset: u64, high_precision: bool) -> u64 {
    if high_precision || high_precision_offset < FLAG_OFFSET {
        high_precision_offset
    } else {
        high_precision_offset - TIE_POINT_DIFFERENCE
    }
}

static_assertions::const_assert_eq!(
    TIE_POINT_OFFSET + HIGH_PRECISION_NAV_POINTS as u64 * NAV_POINT_SIZE,
    FLAG_OFFSET
);
static_assertions::const_assert_eq!(
    (HIGH_PRECISION_NAV_POINTS - LOW_PRECISION_NAV_POINTS) as u64 * NAV_POINT_SIZE,
    TIE_POINT_DIFFERENCE
);
static_assertions::const_assert!(
    SCENE_RADIANCE_OFFSET + (RADIANCE_ROWS as u64) * (EXPECTED_PRODUCT_WIDTH as u64) * 2
        <= TIE_POINT_OFFSET
);
static_assertions::const_assert!(
    CLOUD_OFFSET + EXPECTED_PRODUCT_WIDTH as u64 * 2 <= FRAME_INDICATOR_OFFSET
);
static_assertions::const_assert!(FRAME_INDICATOR_OFFSET + 4 <= HIGH_PRECISION_MDR_SIZE as u64);

/// Validate the class, group and subclass of a record header
///
/// # Errors
///
/// Returns `UnsupportedProduct` carrying the offending values
pub fn validate_record(
    header: &RecordHeader,
    record: &'static str,
    class: RecordClass,
    group: InstrumentGroup,
    subclass: u8,
) -> Result<(), FormatError> {
    if header.class != class || header.instrument_group != group || header.subclass != subclass {
        return Err(FormatError::UnsupportedProduct {
            record,
            class: header.class,
            group: header.instrument_group,
            subclass: header.subclass,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_record() {
        let header = RecordHeader {
            class: RecordClass::Sphr,
            instrument_group: InstrumentGroup::Avhrr3,
            subclass: 0,
            subclass_version: 2,
            size: 100,
            start_time: Timestamp::default(),
            end_time: Timestamp::default(),
        };

        assert!(
            validate_record(&header, "SPHR", RecordClass::Sphr, InstrumentGroup::Avhrr3, 0)
                .is_ok()
        );

        let err = validate_record(&header, "MPHR", RecordClass::Mphr, InstrumentGroup::Generic, 0)
            .unwrap_err();
        assert_eq!(
            err,
            FormatError::UnsupportedProduct {
                record: "MPHR",
                class: RecordClass::Sphr,
                group: InstrumentGroup::Avhrr3,
                subclass: 0,
            }
        );
    }

    #[test]
    fn test_low_precision_size() {
        assert_eq!(LOW_PRECISION_MDR_SIZE, 25_828);
    }

    #[test]
    fn test_field_offset() {
        assert_eq!(field_offset(SCENE_RADIANCE_OFFSET, false), SCENE_RADIANCE_OFFSET);
        assert_eq!(field_offset(TIE_POINT_OFFSET, false), TIE_POINT_OFFSET);
        assert_eq!(field_offset(FLAG_OFFSET, true), FLAG_OFFSET);
        assert_eq!(field_offset(FLAG_OFFSET, false), 21_372);
        assert_eq!(field_offset(FRAME_INDICATOR_OFFSET, false), 25_748);
        assert!(field_offset(FRAME_INDICATOR_OFFSET, false) + 4 <= u64::from(LOW_PRECISION_MDR_SIZE));
    }
}
