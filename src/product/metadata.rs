//! Metadata tree built from the decoded header and auxiliary records

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::geometry::ProductGeometry;
use crate::format::{
    AsciiRecord, FieldGroup, FieldKind, RadianceCalibration, IR_TEMPERATURE_SETS,
    MAIN_HEADER_FIELDS,
};

/// Typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Free text
    Text(String),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// UTC date
    Date(DateTime<Utc>),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
        }
    }
}

/// Named value with optional unit and description
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataAttribute {
    /// Attribute name
    pub name: String,
    /// Value
    pub value: AttributeValue,
    /// Physical unit
    pub unit: Option<String>,
    /// Description
    pub description: Option<String>,
}

impl MetadataAttribute {
    /// Attribute without unit or description
    pub fn new(name: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            name: name.into(),
            value,
            unit: None,
            description: None,
        }
    }

    /// Attach a unit
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attach a description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Named group of attributes and nested elements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataElement {
    /// Element name
    pub name: String,
    /// Attributes in insertion order
    pub attributes: Vec<MetadataAttribute>,
    /// Child elements in insertion order
    pub elements: Vec<MetadataElement>,
}

impl MetadataElement {
    /// Empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append an attribute
    pub fn add_attribute(&mut self, attribute: MetadataAttribute) {
        self.attributes.push(attribute);
    }

    /// Append a child element
    pub fn add_element(&mut self, element: MetadataElement) {
        self.elements.push(element);
    }

    /// First child element with the given name
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&MetadataElement> {
        self.elements.iter().find(|element| element.name == name)
    }

    /// First attribute with the given name
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&MetadataAttribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

/// `MPH`: the main header grouped into its metadata sections.
///
/// Absent keys are left out. Values that do not parse as their declared
/// type are left out with a warning.
pub fn main_header_element(record: &AsciiRecord) -> MetadataElement {
    let mut root = MetadataElement::new("MPH");

    for group in FieldGroup::ALL {
        let mut element = MetadataElement::new(group.name());
        for field in MAIN_HEADER_FIELDS.iter().filter(|field| field.group == group) {
            if !record.contains(field.key) {
                continue;
            }

            let value = match field.kind {
                FieldKind::Text => record.get_str(field.key).map(|v| AttributeValue::Text(v.to_string())),
                FieldKind::Int => record.get_long(field.key).map(AttributeValue::Int),
                FieldKind::Scaled(scale) => record
                    .get_long(field.key)
                    .map(|raw| AttributeValue::Float(raw as f64 * scale.value())),
                FieldKind::Date | FieldKind::LongDate => {
                    record.get_date(field.key).map(AttributeValue::Date)
                }
            };

            let value = match value {
                Ok(value) => value,
                Err(err) => {
                    warn!(key = field.key, error = %err, "skipping main header field");
                    continue;
                }
            };

            let mut attribute = MetadataAttribute::new(field.key, value);
            attribute.unit = field.unit.map(str::to_string);
            attribute.description = field.description.map(str::to_string);
            element.add_attribute(attribute);
        }
        root.add_element(element);
    }

    root
}

/// `SPH`: integers where the value parses as one, text otherwise
pub fn secondary_header_element(record: &AsciiRecord) -> MetadataElement {
    let mut element = MetadataElement::new("SPH");
    for (key, _) in record.iter() {
        let value = match record.get_long(key) {
            Ok(value) => AttributeValue::Int(value),
            Err(_) => AttributeValue::Text(record.get_str(key).unwrap_or_default().to_string()),
        };
        element.add_attribute(MetadataAttribute::new(key, value));
    }
    element
}

/// `GEADR`: free texts keyed by subclass
pub fn free_text_element(free_texts: &BTreeMap<u8, String>) -> MetadataElement {
    let mut element = MetadataElement::new("GEADR");
    for (subclass, text) in free_texts {
        element.add_attribute(MetadataAttribute::new(
            subclass.to_string(),
            AttributeValue::Text(text.clone()),
        ));
    }
    element
}

/// `GIADR_RADIANCE`: the radiance calibration record
pub fn calibration_element(calibration: &RadianceCalibration) -> MetadataElement {
    let mut element = MetadataElement::new("GIADR_RADIANCE");
    let int = |name: &str, value: u16| MetadataAttribute::new(name, AttributeValue::Int(i64::from(value)));

    element.add_attribute(int(
        "RAMP_CALIBRATION_COEFFICIENT",
        calibration.ramp_calibration_coefficient,
    ));
    element.add_attribute(int("YEAR_RECENT_CALIBRATION", calibration.year_recent_calibration));
    element.add_attribute(int("DAY_RECENT_CALIBRATION", calibration.day_recent_calibration));
    element.add_attribute(int(
        "PRIMARY_CALIBRATION_ALGORITHM_ID",
        calibration.primary_calibration_algorithm_id,
    ));
    element.add_attribute(int(
        "PRIMARY_CALIBRATION_ALGORITHM_OPTION",
        calibration.primary_calibration_algorithm_option,
    ));
    element.add_attribute(int(
        "SECONDARY_CALIBRATION_ALGORITHM_ID",
        calibration.secondary_calibration_algorithm_id,
    ));
    element.add_attribute(int(
        "SECONDARY_CALIBRATION_ALGORITHM_OPTION",
        calibration.secondary_calibration_algorithm_option,
    ));

    for set in 0..IR_TEMPERATURE_SETS {
        for (term, value) in calibration.ir_temperature_coefficients[set].iter().enumerate() {
            element.add_attribute(MetadataAttribute::new(
                format!("IR_TEMPERATURE{}_COEFFICIENT{}", set + 1, term + 1),
                AttributeValue::Float(*value),
            ));
        }
    }

    for (name, coefficients) in ["1", "2", "3A"].iter().zip(&calibration.visible) {
        element.add_attribute(
            MetadataAttribute::new(
                format!("SOLAR_FILTERED_IRRADIANCE_{name}"),
                AttributeValue::Float(coefficients.solar_irradiance),
            )
            .with_unit("W/m^2"),
        );
        element.add_attribute(
            MetadataAttribute::new(
                format!("EQUIVALENT_FILTER_WIDTH_{name}"),
                AttributeValue::Float(coefficients.equivalent_filter_width),
            )
            .with_unit("um"),
        );
    }

    for (name, coefficients) in ["3B", "4", "5"].iter().zip(&calibration.infrared) {
        element.add_attribute(
            MetadataAttribute::new(
                format!("CENTRAL_WAVENUMBER_{name}"),
                AttributeValue::Float(coefficients.central_wavenumber),
            )
            .with_unit("cm^-1"),
        );
        element.add_attribute(
            MetadataAttribute::new(
                format!("CONSTANT1_{name}"),
                AttributeValue::Float(coefficients.constant1),
            )
            .with_unit("K"),
        );
        element.add_attribute(MetadataAttribute::new(
            format!("CONSTANT2_{name}"),
            AttributeValue::Float(coefficients.constant2),
        ));
    }

    element
}

/// `READER_INFO`: pixels and lines cut to align the raster with the
/// navigation grid
pub fn reader_info_element(geometry: &ProductGeometry) -> MetadataElement {
    let mut element = MetadataElement::new("READER_INFO");
    element.add_attribute(
        MetadataAttribute::new("TRIM_LEFT", AttributeValue::Int(i64::from(geometry.trim_left)))
            .with_unit("pixel")
            .with_description("Number of pixels cut from the left of the product to match the tie-points."),
    );
    element.add_attribute(
        MetadataAttribute::new("TRIM_RIGHT", AttributeValue::Int(i64::from(geometry.trim_right)))
            .with_unit("pixel")
            .with_description("Number of pixels cut from the right of the product to match the tie-points."),
    );
    element.add_attribute(
        MetadataAttribute::new(
            "TRIM_BOTTOM",
            AttributeValue::Int(i64::from(geometry.trailing_lines_skipped)),
        )
        .with_unit("pixel")
        .with_description("Number of lines cut from the end of the product to match the tie-points."),
    );
    element
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{InfraredCoefficients, MAIN_HEADER_FIELD_COUNT};
    use chrono::Datelike;

    fn main_header() -> AsciiRecord {
        let mut record = AsciiRecord::default();
        record.insert("PRODUCT_NAME", "AVHR_xxx_1B_M02_20070322091503Z");
        record.insert("SENSING_START", "20070322091503Z");
        record.insert("STATE_VECTOR_TIME", "20070322082214123Z");
        record.insert("INCLINATION", "+098704");
        record.insert("ECCENTRICITY", "+0001234");
        record.insert("ACTUAL_PRODUCT_SIZE", "00026902145");
        record.insert("TOTAL_MDR", "+1080");
        record.insert("ORBIT_START", "garbage");
        record
    }

    #[test]
    fn test_main_header_groups() {
        let element = main_header_element(&main_header());
        assert_eq!(element.name, "MPH");
        assert_eq!(element.elements.len(), FieldGroup::ALL.len());

        let details = element.element("PRODUCT_DETAILS").unwrap();
        let size = details.attribute("ACTUAL_PRODUCT_SIZE").unwrap();
        assert_eq!(size.value, AttributeValue::Int(26_902_145));
        assert_eq!(size.unit.as_deref(), Some("bytes"));
        assert_eq!(
            details.attribute("PRODUCT_NAME").unwrap().description.as_deref(),
            Some("Complete name of the product")
        );
        match &details.attribute("SENSING_START").unwrap().value {
            AttributeValue::Date(date) => assert_eq!(date.year(), 2007),
            other => panic!("unexpected value {other:?}"),
        }
        // unparsable integer is skipped
        assert!(details.attribute("ORBIT_START").is_none());
        // absent key is skipped
        assert!(details.attribute("SPACECRAFT_ID").is_none());

        let orbit = element.element("ASCENDING_NODE_ORBIT_PARAMETERS").unwrap();
        match orbit.attribute("INCLINATION").unwrap().value {
            AttributeValue::Float(value) => assert!((value - 98.704).abs() < 1e-9),
            ref other => panic!("unexpected value {other:?}"),
        }
        match orbit.attribute("ECCENTRICITY").unwrap().value {
            AttributeValue::Float(value) => assert!((value - 0.001_234).abs() < 1e-12),
            ref other => panic!("unexpected value {other:?}"),
        }
        assert!(matches!(
            orbit.attribute("STATE_VECTOR_TIME").unwrap().value,
            AttributeValue::Date(_)
        ));

        let counts = element.element("RECORD_COUNTS").unwrap();
        assert_eq!(
            counts.attribute("TOTAL_MDR").unwrap().value,
            AttributeValue::Int(1080)
        );
        assert!(MAIN_HEADER_FIELD_COUNT > counts.attributes.len());
    }

    #[test]
    fn test_secondary_header() {
        let mut record = AsciiRecord::default();
        record.insert("SRC_DATA_QUAL", "x");
        record.insert("NAV_SAMPLE_RATE", "020");
        let element = secondary_header_element(&record);
        assert_eq!(element.attributes[0].value, AttributeValue::Text("x".to_string()));
        assert_eq!(element.attributes[1].value, AttributeValue::Int(20));
    }

    #[test]
    fn test_free_text_element() {
        let mut texts = BTreeMap::new();
        texts.insert(2, "two".to_string());
        texts.insert(1, "one".to_string());
        let element = free_text_element(&texts);
        assert_eq!(element.attributes[0].name, "1");
        assert_eq!(element.attribute("2").unwrap().value.to_string(), "two");
    }

    #[test]
    fn test_calibration_element() {
        let mut calibration = RadianceCalibration::default();
        calibration.infrared[1] = InfraredCoefficients {
            central_wavenumber: 927.2,
            constant1: 0.55,
            constant2: 0.99,
        };
        let element = calibration_element(&calibration);
        assert_eq!(element.attributes.len(), 7 + 24 + 6 + 9);
        let wavenumber = element.attribute("CENTRAL_WAVENUMBER_4").unwrap();
        assert_eq!(wavenumber.value, AttributeValue::Float(927.2));
        assert_eq!(wavenumber.unit.as_deref(), Some("cm^-1"));
        assert!(element.attribute("IR_TEMPERATURE4_COEFFICIENT6").is_some());
    }
}
