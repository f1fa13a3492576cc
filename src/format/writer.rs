//! Product writer
//!
//! Lays out a complete Level-1B product: main and secondary headers, the
//! pointer table, free text and calibration records, then one measurement
//! record per scan line. Every record goes through the same encoders the
//! decoder is tested against.

use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::debug;

use super::ascii::AsciiRecord;
use super::giadr::{RadianceCalibration, GIADR_RADIANCE_SIZE};
use super::header::{InstrumentGroup, RecordClass, RecordHeader, Timestamp, RECORD_HEADER_SIZE};
use super::mphr::{FieldKind, MAIN_HEADER_FIELDS};
use super::pointer::{PointerEntry, FREE_TEXT_RECORD_SIZE, FREE_TEXT_SIZE, IPR_SIZE};
use super::{
    field_offset, CLOUD_OFFSET, EXPECTED_PRODUCT_WIDTH, FLAG_OFFSET, FRAME_INDICATOR_CHANNEL_3A,
    FRAME_INDICATOR_OFFSET, HIGH_PRECISION_MDR_SIZE, HIGH_PRECISION_NAV_POINTS,
    LOW_PRECISION_MDR_SIZE, LOW_PRECISION_NAV_POINTS, MDR_SUBCLASS, RADIANCE_ROWS,
    SCENE_RADIANCE_OFFSET, TIE_POINT_OFFSET,
};
use crate::{MetopError, Result};

const DATE_FORMAT: &str = "%Y%m%d%H%M%SZ";
const LONG_DATE_FORMAT: &str = "%Y%m%d%H%M%S%3fZ";

/// Nominal AVHRR scan line period in milliseconds
pub const LINE_PERIOD_MILLIS: i64 = 167;

/// Content of one measurement record
#[derive(Debug, Clone, PartialEq)]
pub struct ScanLine {
    /// Raw scene radiance counts per row (ch1, ch2, ch3A/3B, ch4, ch5),
    /// 2048 samples each
    pub radiances: [Vec<i16>; RADIANCE_ROWS],
    /// Cloud information, 2048 samples
    pub cloud: Vec<u16>,
    /// Quality indicator bits
    pub quality_indicator: u32,
    /// Scan line quality bits
    pub scan_line_quality: u32,
    /// Frame indicator bits
    pub frame_indicator: u32,
    /// Navigation angles per point (sun zenith, view zenith, sun azimuth,
    /// view azimuth) in 1e-2 deg
    pub angles: Vec<[i16; 4]>,
    /// Earth location per point (latitude, longitude) in 1e-4 deg
    pub locations: Vec<[i32; 2]>,
}

impl ScanLine {
    /// Zero-filled scan line with `nav_points` navigation points, channel 3B
    #[must_use]
    pub fn new(nav_points: usize) -> Self {
        let width = EXPECTED_PRODUCT_WIDTH as usize;
        Self {
            radiances: std::array::from_fn(|_| vec![0; width]),
            cloud: vec![0; width],
            quality_indicator: 0,
            scan_line_quality: 0,
            frame_indicator: 0,
            angles: vec![[0; 4]; nav_points],
            locations: vec![[0; 2]; nav_points],
        }
    }

    /// Select channel 3A (`true`) or 3B (`false`) in the frame indicator
    pub fn set_channel_3a(&mut self, channel_3a: bool) {
        if channel_3a {
            self.frame_indicator |= FRAME_INDICATOR_CHANNEL_3A;
        } else {
            self.frame_indicator &= !FRAME_INDICATOR_CHANNEL_3A;
        }
    }

    /// Whether the frame indicator selects channel 3A
    #[must_use]
    pub fn is_channel_3a(&self) -> bool {
        self.frame_indicator & FRAME_INDICATOR_CHANNEL_3A != 0
    }

    fn encode(&self, buf: &mut [u8], high_precision: bool) -> Result<()> {
        let width = EXPECTED_PRODUCT_WIDTH as usize;
        if self.radiances.iter().any(|row| row.len() != width) || self.cloud.len() != width {
            return Err(MetopError::InvalidArgument(format!(
                "scan line rows must hold {width} samples"
            )));
        }

        let mut cursor = Cursor::new(buf);

        cursor.seek(SeekFrom::Start(SCENE_RADIANCE_OFFSET))?;
        for value in self.radiances.iter().flatten() {
            cursor.write_i16::<BigEndian>(*value)?;
        }

        cursor.seek(SeekFrom::Start(TIE_POINT_OFFSET))?;
        for angles in &self.angles {
            for value in angles {
                cursor.write_i16::<BigEndian>(*value)?;
            }
        }
        for location in &self.locations {
            for value in location {
                cursor.write_i32::<BigEndian>(*value)?;
            }
        }

        cursor.seek(SeekFrom::Start(field_offset(FLAG_OFFSET, high_precision)))?;
        cursor.write_u32::<BigEndian>(self.quality_indicator)?;
        cursor.write_u32::<BigEndian>(self.scan_line_quality)?;

        cursor.seek(SeekFrom::Start(field_offset(CLOUD_OFFSET, high_precision)))?;
        for value in &self.cloud {
            cursor.write_u16::<BigEndian>(*value)?;
        }

        cursor.seek(SeekFrom::Start(field_offset(FRAME_INDICATOR_OFFSET, high_precision)))?;
        cursor.write_u32::<BigEndian>(self.frame_indicator)?;

        Ok(())
    }
}

/// Builder for a synthetic product
#[derive(Debug, Clone)]
pub struct ProductWriter {
    sample_rate: i64,
    earth_views: i64,
    declared_scan_lines: Option<i64>,
    header_overrides: Vec<(String, String)>,
    calibration: Option<RadianceCalibration>,
    free_texts: Vec<(u8, String)>,
    scan_lines: Vec<ScanLine>,
    start_time: DateTime<Utc>,
}

impl ProductWriter {
    /// New writer for the given navigation sample rate (20 or 40)
    #[must_use]
    pub fn new(sample_rate: i64) -> Self {
        Self {
            sample_rate,
            earth_views: i64::from(EXPECTED_PRODUCT_WIDTH),
            declared_scan_lines: None,
            header_overrides: Vec::new(),
            calibration: Some(RadianceCalibration::default()),
            free_texts: Vec::new(),
            scan_lines: Vec::new(),
            start_time: Utc
                .with_ymd_and_hms(2007, 3, 22, 9, 15, 3)
                .single()
                .unwrap_or_default(),
        }
    }

    /// Whether scan lines carry the 103 point navigation
    #[must_use]
    pub fn is_high_precision(&self) -> bool {
        self.sample_rate != 40
    }

    /// Navigation points per scan line
    #[must_use]
    pub fn nav_points(&self) -> usize {
        if self.is_high_precision() {
            HIGH_PRECISION_NAV_POINTS as usize
        } else {
            LOW_PRECISION_NAV_POINTS as usize
        }
    }

    /// Size of one measurement record
    #[must_use]
    pub fn mdr_size(&self) -> u32 {
        if self.is_high_precision() {
            HIGH_PRECISION_MDR_SIZE
        } else {
            LOW_PRECISION_MDR_SIZE
        }
    }

    /// Zero-filled scan line sized for this writer's navigation
    #[must_use]
    pub fn blank_scan_line(&self) -> ScanLine {
        ScanLine::new(self.nav_points())
    }

    /// Value written as `EARTH_VIEWS_PER_SCANLINE`
    #[must_use]
    pub fn earth_views(mut self, earth_views: i64) -> Self {
        self.earth_views = earth_views;
        self
    }

    /// Value written as `TOTAL_MDR`; defaults to the number of scan lines
    #[must_use]
    pub fn declared_scan_lines(mut self, count: i64) -> Self {
        self.declared_scan_lines = Some(count);
        self
    }

    /// Override a main header field after the defaults are filled in
    #[must_use]
    pub fn main_header_field(mut self, key: &str, value: &str) -> Self {
        self.header_overrides.push((key.to_string(), value.to_string()));
        self
    }

    /// Radiance calibration record to write
    #[must_use]
    pub fn calibration(mut self, calibration: RadianceCalibration) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// Leave the radiance calibration record out
    #[must_use]
    pub fn without_calibration(mut self) -> Self {
        self.calibration = None;
        self
    }

    /// Append a free text record; text beyond 100 bytes is cut
    #[must_use]
    pub fn free_text(mut self, subclass: u8, text: &str) -> Self {
        self.free_texts.push((subclass, text.to_string()));
        self
    }

    /// Sensing start of the first scan line
    #[must_use]
    pub fn start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }

    /// Append one scan line
    #[must_use]
    pub fn scan_line(mut self, scan_line: ScanLine) -> Self {
        self.scan_lines.push(scan_line);
        self
    }

    /// Append scan lines
    #[must_use]
    pub fn scan_lines(mut self, scan_lines: impl IntoIterator<Item = ScanLine>) -> Self {
        self.scan_lines.extend(scan_lines);
        self
    }

    /// Encode the whole product
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a scan line does not match the raster
    /// width or the navigation precision
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let nav_points = self.nav_points();
        if let Some(line) = self
            .scan_lines
            .iter()
            .position(|line| line.angles.len() != nav_points || line.locations.len() != nav_points)
        {
            return Err(MetopError::InvalidArgument(format!(
                "scan line {line} must carry {nav_points} navigation points"
            )));
        }

        let line_count = self.scan_lines.len() as i64;
        let end_time = self.line_time(line_count);
        let product_start = Timestamp::from_datetime(&self.start_time);
        let product_end = Timestamp::from_datetime(&end_time);

        // Pointer table layout
        let ipr_count = self.free_texts.len() + usize::from(self.calibration.is_some()) + 1;
        let mut main_header = self.main_header(end_time, ipr_count, 0);
        let secondary_header = self.secondary_header();
        let mphr_size = RECORD_HEADER_SIZE as u32 + main_header.encoded_len() as u32;
        let sphr_size = RECORD_HEADER_SIZE as u32 + secondary_header.encoded_len() as u32;
        let ipr_start = mphr_size + sphr_size;
        let aux_start = ipr_start + ipr_count as u32 * IPR_SIZE;
        let giadr_start = aux_start + self.free_texts.len() as u32 * FREE_TEXT_RECORD_SIZE;
        let mdr_start =
            giadr_start + u32::from(self.calibration.is_some()) * GIADR_RADIANCE_SIZE;
        let mdr_size = self.mdr_size();
        let total_size = u64::from(mdr_start) + line_count as u64 * u64::from(mdr_size);

        main_header = self.main_header(end_time, ipr_count, total_size);

        let mut bytes = Vec::with_capacity(total_size as usize);

        header(RecordClass::Mphr, InstrumentGroup::Generic, 0, mphr_size, product_start, product_end)
            .write_to(&mut bytes)?;
        main_header.write_to(&mut bytes)?;

        header(RecordClass::Sphr, InstrumentGroup::Avhrr3, 0, sphr_size, product_start, product_end)
            .write_to(&mut bytes)?;
        secondary_header.write_to(&mut bytes)?;

        // Pointers: free texts, calibration, scan lines
        for (index, (subclass, _)) in self.free_texts.iter().enumerate() {
            let offset = aux_start + index as u32 * FREE_TEXT_RECORD_SIZE;
            PointerEntry::new(RecordClass::Geadr, InstrumentGroup::Generic, *subclass, offset)
                .write_to(&mut bytes)?;
        }
        if let Some(calibration) = &self.calibration {
            PointerEntry::new(
                RecordClass::Giadr,
                InstrumentGroup::Avhrr3,
                calibration.header.subclass,
                giadr_start,
            )
            .write_to(&mut bytes)?;
        }
        PointerEntry::new(RecordClass::Mdr, InstrumentGroup::Avhrr3, MDR_SUBCLASS, mdr_start)
            .write_to(&mut bytes)?;

        for (subclass, text) in &self.free_texts {
            header(
                RecordClass::Geadr,
                InstrumentGroup::Generic,
                *subclass,
                FREE_TEXT_RECORD_SIZE,
                product_start,
                product_end,
            )
            .write_to(&mut bytes)?;
            let mut payload = text.as_bytes().to_vec();
            payload.resize(FREE_TEXT_SIZE, b' ');
            bytes.write_all(&payload)?;
        }

        if let Some(calibration) = &self.calibration {
            calibration.write_to(&mut bytes)?;
        }

        let high_precision = self.is_high_precision();
        for (index, line) in self.scan_lines.iter().enumerate() {
            let mut record = vec![0u8; mdr_size as usize];
            header(
                RecordClass::Mdr,
                InstrumentGroup::Avhrr3,
                MDR_SUBCLASS,
                mdr_size,
                Timestamp::from_datetime(&self.line_time(index as i64)),
                Timestamp::from_datetime(&self.line_time(index as i64 + 1)),
            )
            .write_to(&mut &mut record[..])?;
            line.encode(&mut record, high_precision)?;
            bytes.write_all(&record)?;
        }

        debug!(
            size = bytes.len(),
            scan_lines = line_count,
            sample_rate = self.sample_rate,
            "product encoded"
        );

        Ok(bytes)
    }

    /// Encode the product into a file
    ///
    /// # Errors
    ///
    /// Returns error if encoding or the write fails
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn line_time(&self, line: i64) -> DateTime<Utc> {
        self.start_time + Duration::milliseconds(line * LINE_PERIOD_MILLIS)
    }

    fn main_header(&self, end_time: DateTime<Utc>, ipr_count: usize, product_size: u64) -> AsciiRecord {
        let start = self.start_time.format(DATE_FORMAT).to_string();
        let end = end_time.format(DATE_FORMAT).to_string();
        let line_count = self.scan_lines.len();
        let free_texts = self.free_texts.len();
        let calibrations = usize::from(self.calibration.is_some());

        let mut record = AsciiRecord::default();
        for field in &MAIN_HEADER_FIELDS {
            let value = match field.key {
                "PRODUCT_NAME" => format!(
                    "AVHR_xxx_1B_M02_{}_{}_N_O_{}",
                    &start[..14],
                    &end[..14],
                    &end[..14]
                ),
                "INSTRUMENT_ID" => "AVHR".to_string(),
                "INSTRUMENT_MODEL" => "1".to_string(),
                "PRODUCT_TYPE" => "xxx".to_string(),
                "PROCESSING_LEVEL" => "1B".to_string(),
                "SPACECRAFT_ID" => "M02".to_string(),
                "PROCESSING_CENTRE" => "CGS1".to_string(),
                "PROCESSING_MODE" => "N".to_string(),
                "DISPOSITION_MODE" => "O".to_string(),
                "RECEIVING_GROUND_STATION" => "SVL".to_string(),
                "SEMI_MAJOR_AXIS" => "+7204482000".to_string(),
                "SUBSETTED_PRODUCT" => "F".to_string(),
                "SENSING_END" | "SENSING_END_THEORETICAL" | "PROCESSING_TIME_END"
                | "RECEIVE_TIME_END" => end.clone(),
                "ACTUAL_PRODUCT_SIZE" => format!("{product_size:011}"),
                "TOTAL_RECORDS" => {
                    format!("{:+07}", 2 + ipr_count + free_texts + calibrations + line_count)
                }
                "TOTAL_MPHR" | "TOTAL_SPHR" => "+001".to_string(),
                "TOTAL_IPR" => format!("{ipr_count:+04}"),
                "TOTAL_GEADR" => format!("{free_texts:+04}"),
                "TOTAL_GIADR" => format!("{calibrations:+04}"),
                "TOTAL_MDR" => format!(
                    "{:+05}",
                    self.declared_scan_lines.unwrap_or(line_count as i64)
                ),
                "DURATION_OF_PRODUCT" | "MILLISECONDS_OF_DATA_PRESENT" => {
                    format!("{:08}", line_count as i64 * LINE_PERIOD_MILLIS)
                }
                _ => match field.kind {
                    FieldKind::Text => "x".to_string(),
                    FieldKind::Int => "+0".to_string(),
                    FieldKind::Scaled(_) => "+0000000".to_string(),
                    FieldKind::Date => start.clone(),
                    FieldKind::LongDate => self.start_time.format(LONG_DATE_FORMAT).to_string(),
                },
            };
            record.insert(field.key, value);
        }

        for (key, value) in &self.header_overrides {
            record.insert(key.as_str(), value.as_str());
        }

        record
    }

    fn secondary_header(&self) -> AsciiRecord {
        let mut record = AsciiRecord::default();
        record.insert("SRC_DATA_QUAL", "0");
        record.insert("EARTH_VIEWS_PER_SCANLINE", format!("{:05}", self.earth_views));
        record.insert("NAV_SAMPLE_RATE", format!("{:03}", self.sample_rate));
        record
    }
}

fn header(
    class: RecordClass,
    instrument_group: InstrumentGroup,
    subclass: u8,
    size: u32,
    start_time: Timestamp,
    end_time: Timestamp,
) -> RecordHeader {
    RecordHeader {
        class,
        instrument_group,
        subclass,
        subclass_version: 2,
        size,
        start_time,
        end_time,
    }
}
