//! Radiance calibration record (GIADR subclass 1)

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::header::{InstrumentGroup, RecordClass, RecordHeader, Timestamp};
use crate::error::FormatError;
use crate::{MetopError, Result};

/// Subclass of the radiance calibration record
pub const GIADR_RADIANCE_SUBCLASS: u8 = 1;

/// Encoded size of the radiance calibration record, header included
pub const GIADR_RADIANCE_SIZE: u32 = 130;

/// Number of IR temperature polynomials
pub const IR_TEMPERATURE_SETS: usize = 4;

/// Terms per IR temperature polynomial
pub const IR_TEMPERATURE_TERMS: usize = 6;

/// Scale factor per IR temperature polynomial term
pub const IR_TEMPERATURE_SCALE: [f64; IR_TEMPERATURE_TERMS] = [1e-2, 1e-5, 1e-8, 1e-11, 1e-14, 1e-17];

const SOLAR_IRRADIANCE_SCALE: f64 = 1e-1;
const FILTER_WIDTH_SCALE: f64 = 1e-3;
const CENTRAL_WAVENUMBER_SCALE: f64 = 1e-2;
const CONSTANT1_SCALE: f64 = 1e-5;
const CONSTANT2_SCALE: f64 = 1e-6;

/// Calibration coefficients of the visible channels 1, 2 and 3A
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VisibleCoefficients {
    /// Solar filtered irradiance in W/m^2
    pub solar_irradiance: f64,
    /// Equivalent filter width in um
    pub equivalent_filter_width: f64,
}

/// Calibration coefficients of the infrared channels 3B, 4 and 5
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InfraredCoefficients {
    /// Central wavenumber in cm^-1
    pub central_wavenumber: f64,
    /// Band correction offset (K)
    pub constant1: f64,
    /// Band correction slope
    pub constant2: f64,
}

/// Decoded radiance calibration record.
///
/// Values are passed through as decoded; nothing checks that they are
/// physically plausible.
#[derive(Debug, Clone, PartialEq)]
pub struct RadianceCalibration {
    /// Header of the record itself
    pub header: RecordHeader,
    /// Ramp calibration coefficient
    pub ramp_calibration_coefficient: u16,
    /// Year of the most recent calibration
    pub year_recent_calibration: u16,
    /// Day of year of the most recent calibration
    pub day_recent_calibration: u16,
    /// Primary calibration algorithm id
    pub primary_calibration_algorithm_id: u16,
    /// Primary calibration algorithm option bits
    pub primary_calibration_algorithm_option: u16,
    /// Secondary calibration algorithm id
    pub secondary_calibration_algorithm_id: u16,
    /// Secondary calibration algorithm option bits
    pub secondary_calibration_algorithm_option: u16,
    /// IR temperature polynomial coefficients
    pub ir_temperature_coefficients: [[f64; IR_TEMPERATURE_TERMS]; IR_TEMPERATURE_SETS],
    /// Channels 1, 2, 3A
    pub visible: [VisibleCoefficients; 3],
    /// Channels 3B, 4, 5
    pub infrared: [InfraredCoefficients; 3],
}

impl RadianceCalibration {
    /// Decode the record, header first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCalibrationRecord` if the header is unreadable or is
    /// not a GIADR radiance header, and I/O errors on short reads
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let header = RecordHeader::read_from(reader).map_err(|e| match e {
            MetopError::Format(inner) => {
                MetopError::Format(FormatError::InvalidCalibrationRecord(inner.to_string()))
            }
            other => other,
        })?;
        if header.class != RecordClass::Giadr || header.subclass != GIADR_RADIANCE_SUBCLASS {
            return Err(FormatError::InvalidCalibrationRecord(format!(
                "expected GIADR subclass {GIADR_RADIANCE_SUBCLASS}, found {:?} subclass {}",
                header.class, header.subclass
            ))
            .into());
        }

        let ramp_calibration_coefficient = reader.read_u16::<BigEndian>()?;
        let year_recent_calibration = reader.read_u16::<BigEndian>()?;
        let day_recent_calibration = reader.read_u16::<BigEndian>()?;
        let primary_calibration_algorithm_id = reader.read_u16::<BigEndian>()?;
        let primary_calibration_algorithm_option = reader.read_u16::<BigEndian>()?;
        let secondary_calibration_algorithm_id = reader.read_u16::<BigEndian>()?;
        let secondary_calibration_algorithm_option = reader.read_u16::<BigEndian>()?;

        let mut ir_temperature_coefficients = [[0.0; IR_TEMPERATURE_TERMS]; IR_TEMPERATURE_SETS];
        for set in &mut ir_temperature_coefficients {
            for (term, scale) in set.iter_mut().zip(IR_TEMPERATURE_SCALE) {
                *term = f64::from(reader.read_i16::<BigEndian>()?) * scale;
            }
        }

        let mut visible = [VisibleCoefficients::default(); 3];
        for channel in &mut visible {
            channel.solar_irradiance = f64::from(reader.read_i16::<BigEndian>()?) * SOLAR_IRRADIANCE_SCALE;
            channel.equivalent_filter_width =
                f64::from(reader.read_i16::<BigEndian>()?) * FILTER_WIDTH_SCALE;
        }

        let mut infrared = [InfraredCoefficients::default(); 3];
        for channel in &mut infrared {
            channel.central_wavenumber =
                f64::from(reader.read_i32::<BigEndian>()?) * CENTRAL_WAVENUMBER_SCALE;
            channel.constant1 = f64::from(reader.read_i32::<BigEndian>()?) * CONSTANT1_SCALE;
            channel.constant2 = f64::from(reader.read_i32::<BigEndian>()?) * CONSTANT2_SCALE;
        }

        Ok(Self {
            header,
            ramp_calibration_coefficient,
            year_recent_calibration,
            day_recent_calibration,
            primary_calibration_algorithm_id,
            primary_calibration_algorithm_option,
            secondary_calibration_algorithm_id,
            secondary_calibration_algorithm_option,
            ir_temperature_coefficients,
            visible,
            infrared,
        })
    }

    /// Encode the record, rounding every value to its fixed-point scale
    ///
    /// # Errors
    ///
    /// Returns error if the writer fails
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut header = self.header;
        header.size = GIADR_RADIANCE_SIZE;
        header.write_to(writer)?;

        for value in [
            self.ramp_calibration_coefficient,
            self.year_recent_calibration,
            self.day_recent_calibration,
            self.primary_calibration_algorithm_id,
            self.primary_calibration_algorithm_option,
            self.secondary_calibration_algorithm_id,
            self.secondary_calibration_algorithm_option,
        ] {
            writer.write_u16::<BigEndian>(value)?;
        }

        for set in &self.ir_temperature_coefficients {
            for (term, scale) in set.iter().zip(IR_TEMPERATURE_SCALE) {
                writer.write_i16::<BigEndian>((term / scale).round() as i16)?;
            }
        }

        for channel in &self.visible {
            writer.write_i16::<BigEndian>((channel.solar_irradiance / SOLAR_IRRADIANCE_SCALE).round() as i16)?;
            writer.write_i16::<BigEndian>(
                (channel.equivalent_filter_width / FILTER_WIDTH_SCALE).round() as i16,
            )?;
        }

        for channel in &self.infrared {
            writer.write_i32::<BigEndian>(
                (channel.central_wavenumber / CENTRAL_WAVENUMBER_SCALE).round() as i32,
            )?;
            writer.write_i32::<BigEndian>((channel.constant1 / CONSTANT1_SCALE).round() as i32)?;
            writer.write_i32::<BigEndian>((channel.constant2 / CONSTANT2_SCALE).round() as i32)?;
        }

        Ok(())
    }
}

impl Default for RadianceCalibration {
    /// Typical METOP-A values
    fn default() -> Self {
        Self {
            header: RecordHeader {
                class: RecordClass::Giadr,
                instrument_group: InstrumentGroup::Avhrr3,
                subclass: GIADR_RADIANCE_SUBCLASS,
                subclass_version: 2,
                size: GIADR_RADIANCE_SIZE,
                start_time: Timestamp::default(),
                end_time: Timestamp::default(),
            },
            ramp_calibration_coefficient: 0,
            year_recent_calibration: 2007,
            day_recent_calibration: 81,
            primary_calibration_algorithm_id: 1,
            primary_calibration_algorithm_option: 0,
            secondary_calibration_algorithm_id: 0,
            secondary_calibration_algorithm_option: 0,
            ir_temperature_coefficients: [[276.6, 0.0513, 0.0, 0.0, 0.0, 0.0]; IR_TEMPERATURE_SETS],
            visible: [
                VisibleCoefficients {
                    solar_irradiance: 139.0,
                    equivalent_filter_width: 0.084,
                },
                VisibleCoefficients {
                    solar_irradiance: 232.0,
                    equivalent_filter_width: 0.229,
                },
                VisibleCoefficients {
                    solar_irradiance: 14.0,
                    equivalent_filter_width: 0.06,
                },
            ],
            infrared: [
                InfraredCoefficients {
                    central_wavenumber: 2687.0,
                    constant1: 2.06699,
                    constant2: 0.996577,
                },
                InfraredCoefficients {
                    central_wavenumber: 927.2,
                    constant1: 0.55126,
                    constant2: 0.998509,
                },
                InfraredCoefficients {
                    central_wavenumber: 837.7,
                    constant1: 0.34716,
                    constant2: 0.998947,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn raw_record() -> Vec<u8> {
        let mut bytes = Vec::new();
        RecordHeader {
            size: GIADR_RADIANCE_SIZE,
            ..RadianceCalibration::default().header
        }
        .write_to(&mut bytes)
        .unwrap();
        for value in [7u16, 2007, 81, 1, 0, 0, 0] {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        for _ in 0..IR_TEMPERATURE_SETS {
            for raw in [27_660i16, 5_130, 100, 1, -1, 3] {
                bytes.extend_from_slice(&raw.to_be_bytes());
            }
        }
        for (irradiance, width) in [(1390i16, 84i16), (2320, 229), (140, 60)] {
            bytes.extend_from_slice(&irradiance.to_be_bytes());
            bytes.extend_from_slice(&width.to_be_bytes());
        }
        for (wavenumber, c1, c2) in [
            (268_700i32, 206_699i32, 996_577i32),
            (92_720, 55_126, 998_509),
            (83_770, -34_716, 998_947),
        ] {
            bytes.extend_from_slice(&wavenumber.to_be_bytes());
            bytes.extend_from_slice(&c1.to_be_bytes());
            bytes.extend_from_slice(&c2.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn test_record_size() {
        assert_eq!(raw_record().len(), GIADR_RADIANCE_SIZE as usize);
    }

    #[test]
    fn test_scale_factors() {
        let bytes = raw_record();
        let mut cursor = Cursor::new(&bytes);
        let calibration = RadianceCalibration::read_from(&mut cursor).unwrap();

        assert_eq!(cursor.position(), u64::from(GIADR_RADIANCE_SIZE));
        assert_eq!(calibration.ramp_calibration_coefficient, 7);
        assert_eq!(calibration.year_recent_calibration, 2007);

        let set = calibration.ir_temperature_coefficients[3];
        assert!((set[0] - 276.6).abs() < 1e-9);
        assert!((set[1] - 0.0513).abs() < 1e-12);
        assert!((set[2] - 1e-6).abs() < 1e-15);
        assert!((set[3] - 1e-11).abs() < 1e-20);
        assert!((set[4] + 1e-14).abs() < 1e-23);
        assert!((set[5] - 3e-17).abs() < 1e-26);

        assert!((calibration.visible[0].solar_irradiance - 139.0).abs() < 1e-9);
        assert!((calibration.visible[1].equivalent_filter_width - 0.229).abs() < 1e-12);
        assert!((calibration.infrared[1].central_wavenumber - 927.2).abs() < 1e-9);
        assert!((calibration.infrared[0].constant1 - 2.06699).abs() < 1e-12);
        assert!((calibration.infrared[2].constant2 - 0.998947).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_values_pass_through() {
        let bytes = raw_record();
        let calibration = RadianceCalibration::read_from(&mut Cursor::new(&bytes)).unwrap();
        // A negative band correction offset is not physical but is kept as decoded
        assert!((calibration.infrared[2].constant1 + 0.34716).abs() < 1e-12);
    }

    #[test]
    fn test_encode_matches_layout() {
        let calibration = RadianceCalibration::default();
        let mut bytes = Vec::new();
        calibration.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), GIADR_RADIANCE_SIZE as usize);

        let decoded = RadianceCalibration::read_from(&mut Cursor::new(&bytes)).unwrap();
        assert!((decoded.infrared[1].constant2 - 0.998509).abs() < 1e-12);
        assert!((decoded.visible[2].solar_irradiance - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_bad_header() {
        let mut bytes = raw_record();
        bytes[0] = 0xff;
        let err = RadianceCalibration::read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(
            err,
            MetopError::Format(FormatError::InvalidCalibrationRecord(_))
        ));

        let mut bytes = raw_record();
        bytes[2] = 2;
        let err = RadianceCalibration::read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(
            err,
            MetopError::Format(FormatError::InvalidCalibrationRecord(_))
        ));
    }
}
