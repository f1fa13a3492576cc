//! Field table of the main product header record

use super::ascii::MAIN_HEADER_FIELD_COUNT;

/// How a main header value is typed when exposed as metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Signed integer
    Int,
    /// Integer scaled to a float by the given factor
    Scaled(ScaleFactor),
    /// `yyyyMMddHHmmssZ` date
    Date,
    /// `yyyyMMddHHmmssSSSZ` date
    LongDate,
}

/// Decimal scale factor of a fixed-point header value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleFactor {
    /// 1e-3
    Milli,
    /// 1e-6
    Micro,
}

impl ScaleFactor {
    /// Numeric factor
    #[must_use]
    pub fn value(self) -> f64 {
        match self {
            Self::Milli => 1e-3,
            Self::Micro => 1e-6,
        }
    }
}

/// Metadata group a main header field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    /// Product identification and processing
    ProductDetails,
    /// Orbit state at the ascending node
    AscendingNodeOrbitParameters,
    /// Sub-satellite points at start and end
    LocationSummary,
    /// Leap second occurrence
    LeapSecondInformation,
    /// Counts of each record class
    RecordCounts,
    /// Degraded record counts
    RecordBasedGenericQualityFlags,
    /// Product duration and gaps
    TimeBasedGenericRecordFlags,
    /// Subsetting
    RegionalProductInformation,
}

impl FieldGroup {
    /// All groups in metadata order
    pub const ALL: [FieldGroup; 8] = [
        Self::ProductDetails,
        Self::AscendingNodeOrbitParameters,
        Self::LocationSummary,
        Self::LeapSecondInformation,
        Self::RecordCounts,
        Self::RecordBasedGenericQualityFlags,
        Self::TimeBasedGenericRecordFlags,
        Self::RegionalProductInformation,
    ];

    /// Metadata element name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ProductDetails => "PRODUCT_DETAILS",
            Self::AscendingNodeOrbitParameters => "ASCENDING_NODE_ORBIT_PARAMETERS",
            Self::LocationSummary => "LOCATION_SUMMARY",
            Self::LeapSecondInformation => "LEAP_SECOND_INFORMATION",
            Self::RecordCounts => "RECORD_COUNTS",
            Self::RecordBasedGenericQualityFlags => "RECORD_BASED_GENERIC_QUALITY_FLAGS",
            Self::TimeBasedGenericRecordFlags => "TIME_BASED_GENERIC_RECORD_FLAGS",
            Self::RegionalProductInformation => "REGIONAL_PRODUCT_INFORMATION",
        }
    }
}

/// One main header field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderField {
    /// Key as written in the record
    pub key: &'static str,
    /// Metadata group
    pub group: FieldGroup,
    /// Value type
    pub kind: FieldKind,
    /// Physical unit, if any
    pub unit: Option<&'static str>,
    /// Human readable description, if any
    pub description: Option<&'static str>,
}

const fn field(key: &'static str, group: FieldGroup, kind: FieldKind) -> HeaderField {
    HeaderField {
        key,
        group,
        kind,
        unit: None,
        description: None,
    }
}

const fn with_unit(mut field: HeaderField, unit: &'static str) -> HeaderField {
    field.unit = Some(unit);
    field
}

const fn described(mut field: HeaderField, description: &'static str) -> HeaderField {
    field.description = Some(description);
    field
}

use FieldGroup::{
    AscendingNodeOrbitParameters as Orbit, LeapSecondInformation as Leap,
    LocationSummary as Location, ProductDetails as Details,
    RecordBasedGenericQualityFlags as RecordQuality, RecordCounts as Counts,
    RegionalProductInformation as Regional, TimeBasedGenericRecordFlags as TimeQuality,
};
use FieldKind::{Date, Int, LongDate, Text};

const MILLI: FieldKind = FieldKind::Scaled(ScaleFactor::Milli);
const MICRO: FieldKind = FieldKind::Scaled(ScaleFactor::Micro);

/// Every main header field in record order
pub const MAIN_HEADER_FIELDS: [HeaderField; MAIN_HEADER_FIELD_COUNT] = [
    described(field("PRODUCT_NAME", Details, Text), "Complete name of the product"),
    described(field("PARENT_PRODUCT_NAME_1", Details, Text), "Name of the parent product"),
    described(field("PARENT_PRODUCT_NAME_2", Details, Text), "Name of the parent product"),
    described(field("PARENT_PRODUCT_NAME_3", Details, Text), "Name of the parent product"),
    described(field("PARENT_PRODUCT_NAME_4", Details, Text), "Name of the parent product"),
    field("INSTRUMENT_ID", Details, Text),
    field("INSTRUMENT_MODEL", Details, Text),
    field("PRODUCT_TYPE", Details, Text),
    field("PROCESSING_LEVEL", Details, Text),
    field("SPACECRAFT_ID", Details, Text),
    field("SENSING_START", Details, Date),
    field("SENSING_END", Details, Date),
    field("SENSING_START_THEORETICAL", Details, Date),
    field("SENSING_END_THEORETICAL", Details, Date),
    field("PROCESSING_CENTRE", Details, Text),
    field("PROCESSOR_MAJOR_VERSION", Details, Int),
    field("PROCESSOR_MINOR_VERSION", Details, Int),
    field("FORMAT_MAJOR_VERSION", Details, Int),
    field("FORMAT_MINOR_VERSION", Details, Int),
    field("PROCESSING_TIME_START", Details, Date),
    field("PROCESSING_TIME_END", Details, Date),
    field("PROCESSING_MODE", Details, Text),
    field("DISPOSITION_MODE", Details, Text),
    field("RECEIVING_GROUND_STATION", Details, Text),
    field("RECEIVE_TIME_START", Details, Date),
    field("RECEIVE_TIME_END", Details, Date),
    described(
        field("ORBIT_START", Details, Int),
        "Start Orbit Number, counted incrementally since launch",
    ),
    described(field("ORBIT_END", Details, Int), "Stop Orbit Number"),
    described(
        with_unit(field("ACTUAL_PRODUCT_SIZE", Details, Int), "bytes"),
        "Size of the complete product",
    ),
    field("STATE_VECTOR_TIME", Orbit, LongDate),
    with_unit(field("SEMI_MAJOR_AXIS", Orbit, Text), "mm"),
    field("ECCENTRICITY", Orbit, MICRO),
    with_unit(field("INCLINATION", Orbit, MILLI), "deg"),
    with_unit(field("PERIGEE_ARGUMENT", Orbit, MILLI), "deg"),
    with_unit(field("RIGHT_ASCENSION", Orbit, MILLI), "deg"),
    with_unit(field("MEAN_ANOMALY", Orbit, MILLI), "deg"),
    with_unit(field("X_POSITION", Orbit, MILLI), "m"),
    with_unit(field("Y_POSITION", Orbit, MILLI), "m"),
    with_unit(field("Z_POSITION", Orbit, MILLI), "m"),
    with_unit(field("X_VELOCITY", Orbit, MILLI), "m/s"),
    with_unit(field("Y_VELOCITY", Orbit, MILLI), "m/s"),
    with_unit(field("Z_VELOCITY", Orbit, MILLI), "m/s"),
    field("EARTH_SUN_DISTANCE_RATIO", Orbit, Int),
    with_unit(field("LOCATION_TOLERANCE_RADIAL", Orbit, Int), "m"),
    with_unit(field("LOCATION_TOLERANCE_CROSSTRACK", Orbit, Int), "m"),
    with_unit(field("LOCATION_TOLERANCE_ALONGTRACK", Orbit, Int), "m"),
    with_unit(field("YAW_ERROR", Orbit, MILLI), "deg"),
    with_unit(field("ROLL_ERROR", Orbit, MILLI), "deg"),
    with_unit(field("PITCH_ERROR", Orbit, MILLI), "deg"),
    with_unit(field("SUBSAT_LATITUDE_START", Location, MILLI), "deg"),
    with_unit(field("SUBSAT_LONGITUDE_START", Location, MILLI), "deg"),
    with_unit(field("SUBSAT_LATITUDE_END", Location, MILLI), "deg"),
    with_unit(field("SUBSAT_LONGITUDE_END", Location, MILLI), "deg"),
    field("LEAP_SECOND", Leap, Int),
    field("LEAP_SECOND_UTC", Leap, Date),
    field("TOTAL_RECORDS", Counts, Int),
    field("TOTAL_MPHR", Counts, Int),
    field("TOTAL_SPHR", Counts, Int),
    field("TOTAL_IPR", Counts, Int),
    field("TOTAL_GEADR", Counts, Int),
    field("TOTAL_GIADR", Counts, Int),
    field("TOTAL_VEADR", Counts, Int),
    field("TOTAL_VIADR", Counts, Int),
    field("TOTAL_MDR", Counts, Int),
    field("COUNT_DEGRADED_INST_MDR", RecordQuality, Int),
    field("COUNT_DEGRADED_PROC_MDR", RecordQuality, Int),
    field("COUNT_DEGRADED_INST_MDR_BLOCKS", RecordQuality, Int),
    field("COUNT_DEGRADED_PROC_MDR_BLOCKS", RecordQuality, Int),
    with_unit(field("DURATION_OF_PRODUCT", TimeQuality, Int), "ms"),
    with_unit(field("MILLISECONDS_OF_DATA_PRESENT", TimeQuality, Int), "ms"),
    with_unit(field("MILLISECONDS_OF_DATA_MISSING", TimeQuality, Int), "ms"),
    field("SUBSETTED_PRODUCT", Regional, Text),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_unique() {
        let keys: HashSet<_> = MAIN_HEADER_FIELDS.iter().map(|f| f.key).collect();
        assert_eq!(keys.len(), MAIN_HEADER_FIELD_COUNT);
    }

    #[test]
    fn test_every_group_used_in_order() {
        let mut seen = Vec::new();
        for field in &MAIN_HEADER_FIELDS {
            if seen.last() != Some(&field.group) {
                seen.push(field.group);
            }
        }
        assert_eq!(seen, FieldGroup::ALL);
    }
}
