//! Product opening and the band and navigation factories
//!
//! Opening runs through fixed states. Any error ends the open; callers
//! reopen from scratch.
//!
//! ```text
//! Unopened -> HeadersValidated -> GeometryDerived -> AuxiliaryLoaded -> Ready
//! ```

mod geometry;
pub mod metadata;
mod tie_points;

pub use geometry::{
    correct_height, Channel3, HeightCorrection, NavigationLayout, ProductGeometry,
    RawCoordinates, HIGH_PRECISION_SAMPLE_RATE, LOW_PRECISION_SAMPLE_RATE,
};
pub use metadata::{AttributeValue, MetadataAttribute, MetadataElement};
pub use tie_points::{TiePointGrid, TIE_POINT_NAMES};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::band::{CalibratedReader, Channel, CloudReader, FlagReader, RadianceReader};
use crate::calibration::Calibrator;
use crate::config::DecoderConfig;
use crate::error::FormatError;
use crate::format::{
    field_offset, read_pointer_table, validate_record, AsciiRecord, InstrumentGroup, RadianceCalibration,
    RecordClass, RecordHeader, Timestamp, EXPECTED_PRODUCT_WIDTH, FRAME_INDICATOR_OFFSET,
    MAIN_HEADER_FIELD_COUNT, MDR_SUBCLASS, RECORD_HEADER_SIZE, SECONDARY_HEADER_FIELD_COUNT,
};
use crate::stream::SharedStream;
use crate::{MetopError, Result};

/// Open progress, logged at every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenState {
    /// Nothing read yet
    Unopened,
    /// Main and secondary headers decoded and checked
    HeadersValidated,
    /// Raster width and navigation layout known
    GeometryDerived,
    /// Pointer table walked, auxiliary records decoded
    AuxiliaryLoaded,
    /// Height corrected, orbit direction and channel 3 usage known
    Ready,
}

fn transition(from: OpenState, to: OpenState) -> OpenState {
    debug!(?from, ?to, "open state");
    to
}

/// Headers read while validating, before any geometry exists
#[derive(Debug)]
struct Headers {
    main_size: u64,
    secondary_size: u64,
    main: AsciiRecord,
    secondary: AsciiRecord,
}

/// An opened AVHRR/3 Level-1B product
#[derive(Debug)]
pub struct Product<R> {
    stream: SharedStream<R>,
    geometry: Arc<ProductGeometry>,
    product_name: String,
    main_header: AsciiRecord,
    secondary_header: AsciiRecord,
    calibration: Option<RadianceCalibration>,
    free_texts: BTreeMap<u8, String>,
    start_time: Timestamp,
    end_time: Timestamp,
    earth_sun_distance_ratio: f64,
    metadata: MetadataElement,
}

impl Product<BufReader<File>> {
    /// Open a product file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or is not a supported product
    pub fn open_path(path: &Path, config: &DecoderConfig) -> Result<Self> {
        let file = File::open(path)?;
        info!(path = %path.display(), "opening product");
        Self::open(BufReader::new(file), config)
    }
}

impl<R: Read + Seek> Product<R> {
    /// Decode headers, walk the pointer table and derive the geometry.
    ///
    /// # Errors
    ///
    /// Returns a format error for unsupported or malformed products, a
    /// field error for unusable header values, and I/O errors
    pub fn open(mut reader: R, config: &DecoderConfig) -> Result<Self> {
        config.validate()?;
        let mut state = OpenState::Unopened;

        let headers = read_headers(&mut reader)?;
        state = transition(state, OpenState::HeadersValidated);

        let earth_views = headers.secondary.get_long("EARTH_VIEWS_PER_SCANLINE")?;
        if earth_views != i64::from(EXPECTED_PRODUCT_WIDTH) {
            return Err(FormatError::UnexpectedEarthViews {
                expected: EXPECTED_PRODUCT_WIDTH,
                actual: earth_views,
            }
            .into());
        }
        let layout = NavigationLayout::from_sample_rate(headers.secondary.get_long("NAV_SAMPLE_RATE")?)?;
        state = transition(state, OpenState::GeometryDerived);

        let auxiliary = read_pointer_table(&mut reader, headers.main_size + headers.secondary_size)?;
        let declared_height = headers.main.get_long("TOTAL_MDR")?;
        state = transition(state, OpenState::AuxiliaryLoaded);

        let stream = SharedStream::new(reader)?;
        let anchor = auxiliary.first_mdr_offset;
        let first_mdr = read_header_at(&stream, anchor)?;
        validate_record(&first_mdr, "MDR", RecordClass::Mdr, InstrumentGroup::Avhrr3, MDR_SUBCLASS)?;
        let stride = u64::from(first_mdr.size);
        let minimum_stride = field_offset(FRAME_INDICATOR_OFFSET, layout.is_high_precision()) + 4;
        if stride < minimum_stride {
            return Err(FormatError::InvalidRecordSize {
                offset: anchor,
                size: first_mdr.size,
            }
            .into());
        }

        let correction = correct_height(declared_height, anchor, stride, stream.len(), layout.sample_rate)?;
        if correction.truncated {
            warn!(
                declared = declared_height,
                stream_len = stream.len(),
                "scan line count does not match stream length"
            );
        }
        info!(
            height = correction.height,
            skipped = correction.trailing_lines_skipped,
            "scan lines"
        );

        let last_line = correction.height - 1;
        let last_mdr = read_header_at(&stream, anchor + u64::from(last_line) * stride)?;

        let mut geometry = ProductGeometry {
            raster_width: layout.raster_width,
            raster_height: correction.height,
            trim_left: layout.trim_left,
            trim_right: layout.trim_right(),
            navigation_sample_rate: layout.sample_rate,
            navigation_points: layout.nav_points,
            scan_line_stride: stride,
            first_scan_line_offset: anchor,
            high_precision: layout.is_high_precision(),
            ascending: false,
            mirrored: false,
            channel_3: Channel3::Mixed,
            trailing_lines_skipped: correction.trailing_lines_skipped,
        };

        let first_is_3a = stream.read_u8_at(geometry.frame_flag_offset(0))? & 1 == 1;
        let last_is_3a = stream.read_u8_at(geometry.frame_flag_offset(last_line))? & 1 == 1;
        geometry.channel_3 = Channel3::from_flags(first_is_3a, last_is_3a);

        let centre = layout.nav_points / 2;
        let first_latitude = read_i32_at(&stream, geometry.latitude_offset(0, centre))?;
        let last_latitude = read_i32_at(&stream, geometry.latitude_offset(last_line, centre))?;
        geometry.ascending = last_latitude > first_latitude;
        geometry.mirrored = config.orientation.mirrors(geometry.ascending);

        let earth_sun_distance_ratio = config.earth_sun_distance_ratio.unwrap_or_else(|| {
            headers
                .main
                .get_float("EARTH_SUN_DISTANCE_RATIO")
                .ok()
                .filter(|ratio| *ratio > 0.0)
                .unwrap_or(1.0)
        });

        let product_name = headers.main.get_str("PRODUCT_NAME")?.to_string();
        let metadata = build_metadata(&headers, &auxiliary.free_texts, auxiliary.calibration.as_ref(), &geometry);

        state = transition(state, OpenState::Ready);
        info!(
            product = %product_name,
            width = geometry.raster_width,
            height = geometry.raster_height,
            ascending = geometry.ascending,
            mirrored = geometry.mirrored,
            channel_3 = ?geometry.channel_3,
            state = ?state,
            "product opened"
        );

        Ok(Self {
            stream,
            geometry: Arc::new(geometry),
            product_name,
            main_header: headers.main,
            secondary_header: headers.secondary,
            calibration: auxiliary.calibration,
            free_texts: auxiliary.free_texts,
            start_time: first_mdr.start_time,
            end_time: last_mdr.end_time,
            earth_sun_distance_ratio,
            metadata,
        })
    }

    /// `PRODUCT_NAME` from the main header
    #[must_use]
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Start of the first scan line
    #[must_use]
    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    /// End of the last delivered scan line
    #[must_use]
    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    /// Raster geometry
    #[must_use]
    pub fn geometry(&self) -> &ProductGeometry {
        &self.geometry
    }

    /// Main product header fields
    #[must_use]
    pub fn main_header(&self) -> &AsciiRecord {
        &self.main_header
    }

    /// Secondary product header fields
    #[must_use]
    pub fn secondary_header(&self) -> &AsciiRecord {
        &self.secondary_header
    }

    /// Free text records by subclass
    #[must_use]
    pub fn free_texts(&self) -> &BTreeMap<u8, String> {
        &self.free_texts
    }

    /// Radiance calibration record, if the product has one
    #[must_use]
    pub fn calibration(&self) -> Option<&RadianceCalibration> {
        self.calibration.as_ref()
    }

    /// Earth-sun distance used for reflectances
    #[must_use]
    pub fn earth_sun_distance_ratio(&self) -> f64 {
        self.earth_sun_distance_ratio
    }

    /// Metadata tree: `MPH`, `SPH`, `GEADR`, `GIADR_RADIANCE`, `READER_INFO`
    #[must_use]
    pub fn metadata(&self) -> &MetadataElement {
        &self.metadata
    }

    /// Names of the navigation grids
    #[must_use]
    pub fn tie_point_names(&self) -> [&'static str; 6] {
        TIE_POINT_NAMES
    }

    /// Read the navigation grids
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be read
    pub fn tie_point_grids(&self) -> Result<Vec<TiePointGrid>> {
        tie_points::read_tie_point_grids(&self.stream, &self.geometry)
    }

    /// Raw radiance counts of `channel`
    #[must_use]
    pub fn radiance_reader(&self, channel: Channel) -> RadianceReader<R> {
        RadianceReader::new(self.stream.clone(), Arc::clone(&self.geometry), channel)
    }

    /// Reflectance factor of a visible channel (1, 2, 3A)
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for infrared channels or when the product
    /// has no radiance calibration record
    pub fn reflectance_reader(&self, channel: Channel) -> Result<CalibratedReader<R>> {
        let index = channel.visible_index().ok_or_else(|| {
            MetopError::InvalidArgument(format!("channel {} has no reflectance", channel.name()))
        })?;
        let calibration = self.require_calibration()?;
        let calibrator = Calibrator::ReflectanceFactor {
            solar_irradiance: calibration.visible[index].solar_irradiance,
            earth_sun_distance_ratio: self.earth_sun_distance_ratio,
        };
        Ok(CalibratedReader::new(
            self.stream.clone(),
            Arc::clone(&self.geometry),
            channel,
            calibrator,
        ))
    }

    /// Brightness temperature of an infrared channel (3B, 4, 5)
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for visible channels or when the product
    /// has no radiance calibration record
    pub fn temperature_reader(&self, channel: Channel) -> Result<CalibratedReader<R>> {
        let index = channel.infrared_index().ok_or_else(|| {
            MetopError::InvalidArgument(format!(
                "channel {} has no brightness temperature",
                channel.name()
            ))
        })?;
        let coefficients = self.require_calibration()?.infrared[index];
        let calibrator = Calibrator::RadianceToTemperature {
            constant1: coefficients.constant1,
            constant2: coefficients.constant2,
            central_wavenumber: coefficients.central_wavenumber,
        };
        Ok(CalibratedReader::new(
            self.stream.clone(),
            Arc::clone(&self.geometry),
            channel,
            calibrator,
        ))
    }

    /// Per scan line quality flags
    #[must_use]
    pub fn flag_reader(&self) -> FlagReader<R> {
        FlagReader::new(self.stream.clone(), Arc::clone(&self.geometry))
    }

    /// Cloud information
    #[must_use]
    pub fn cloud_reader(&self) -> CloudReader<R> {
        CloudReader::new(self.stream.clone(), Arc::clone(&self.geometry))
    }

    fn require_calibration(&self) -> Result<&RadianceCalibration> {
        self.calibration.as_ref().ok_or_else(|| {
            MetopError::InvalidArgument("product has no radiance calibration record".to_string())
        })
    }
}

/// Check only the main and secondary header records
///
/// # Errors
///
/// Returns I/O errors; a foreign or too short file gives `Ok(false)`
pub fn probe<R: Read + Seek>(reader: &mut R) -> Result<bool> {
    reader.seek(SeekFrom::Start(0))?;
    let Some(main) = probe_header(reader)? else {
        return Ok(false);
    };
    if validate_record(&main, "MPHR", RecordClass::Mphr, InstrumentGroup::Generic, 0).is_err() {
        return Ok(false);
    }

    reader.seek(SeekFrom::Start(u64::from(main.size)))?;
    let Some(secondary) = probe_header(reader)? else {
        return Ok(false);
    };
    Ok(validate_record(&secondary, "SPHR", RecordClass::Sphr, InstrumentGroup::Avhrr3, 0).is_ok())
}

fn probe_header<R: Read>(reader: &mut R) -> Result<Option<RecordHeader>> {
    match RecordHeader::read_from(reader) {
        Ok(header) => Ok(Some(header)),
        Err(MetopError::Format(_)) => Ok(None),
        Err(MetopError::Io(err)) if err.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(err) => Err(err),
    }
}

/// Whether the file at `path` looks like an AVHRR/3 Level-1B product
#[must_use]
pub fn can_open(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };
    match probe(&mut BufReader::new(file)) {
        Ok(accepted) => accepted,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "probe failed");
            false
        }
    }
}

fn read_headers<R: Read + Seek>(reader: &mut R) -> Result<Headers> {
    reader.seek(SeekFrom::Start(0))?;
    let main_header = RecordHeader::read_from(reader)?;
    validate_record(&main_header, "MPHR", RecordClass::Mphr, InstrumentGroup::Generic, 0)?;
    check_record_size(&main_header, 0)?;
    let main = AsciiRecord::read_from(reader, main_header.payload_size(), MAIN_HEADER_FIELD_COUNT)?;

    let secondary_count = main.get_long("TOTAL_SPHR")?;
    if secondary_count != 1 {
        return Err(FormatError::SecondaryHeaderCount(secondary_count).into());
    }

    let secondary_offset = u64::from(main_header.size);
    reader.seek(SeekFrom::Start(secondary_offset))?;
    let secondary_header = RecordHeader::read_from(reader)?;
    validate_record(&secondary_header, "SPHR", RecordClass::Sphr, InstrumentGroup::Avhrr3, 0)?;
    check_record_size(&secondary_header, secondary_offset)?;
    let secondary = AsciiRecord::read_from(
        reader,
        secondary_header.payload_size(),
        SECONDARY_HEADER_FIELD_COUNT,
    )?;

    debug!(
        main_fields = main.len(),
        secondary_fields = secondary.len(),
        "headers read"
    );

    Ok(Headers {
        main_size: u64::from(main_header.size),
        secondary_size: u64::from(secondary_header.size),
        main,
        secondary,
    })
}

fn check_record_size(header: &RecordHeader, offset: u64) -> Result<()> {
    if u64::from(header.size) < RECORD_HEADER_SIZE {
        return Err(FormatError::InvalidRecordSize {
            offset,
            size: header.size,
        }
        .into());
    }
    Ok(())
}

fn read_header_at<R: Read + Seek>(stream: &SharedStream<R>, offset: u64) -> Result<RecordHeader> {
    let mut bytes = [0u8; RECORD_HEADER_SIZE as usize];
    stream.read_at(offset, &mut bytes)?;
    RecordHeader::read_from(&mut &bytes[..])
}

fn read_i32_at<R: Read + Seek>(stream: &SharedStream<R>, offset: u64) -> Result<i32> {
    let mut bytes = [0u8; 4];
    stream.read_at(offset, &mut bytes)?;
    Ok(i32::from_be_bytes(bytes))
}

fn build_metadata(
    headers: &Headers,
    free_texts: &BTreeMap<u8, String>,
    calibration: Option<&RadianceCalibration>,
    geometry: &ProductGeometry,
) -> MetadataElement {
    let mut root = MetadataElement::new("METADATA");
    root.add_element(metadata::main_header_element(&headers.main));
    root.add_element(metadata::secondary_header_element(&headers.secondary));
    if !free_texts.is_empty() {
        root.add_element(metadata::free_text_element(free_texts));
    }
    if let Some(calibration) = calibration {
        root.add_element(metadata::calibration_element(calibration));
    }
    root.add_element(metadata::reader_info_element(geometry));
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::writer::ProductWriter;
    use std::io::Cursor;

    fn product(writer: ProductWriter, lines: usize) -> Product<Cursor<Vec<u8>>> {
        let scan_lines: Vec<_> = (0..lines).map(|_| writer.blank_scan_line()).collect();
        let bytes = writer.scan_lines(scan_lines).to_bytes().unwrap();
        Product::open(Cursor::new(bytes), &DecoderConfig::default()).unwrap()
    }

    #[test]
    fn test_open_minimal() {
        let product = product(ProductWriter::new(20), 21);
        let geometry = product.geometry();
        assert_eq!(geometry.raster_width, 2041);
        assert_eq!(geometry.raster_height, 21);
        assert_eq!(geometry.channel_3, Channel3::B);
        assert!(!geometry.ascending);
        assert!(product.product_name().starts_with("AVHR_xxx_1B_M02_"));
        assert_eq!(product.earth_sun_distance_ratio(), 1.0);
        assert!(product.start_time() < product.end_time());
    }

    #[test]
    fn test_secondary_header_count_checked_first() {
        let writer = ProductWriter::new(20).main_header_field("TOTAL_SPHR", "+002");
        let mut bytes = writer.to_bytes().unwrap();
        let main_size = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        bytes.truncate(main_size as usize);

        let err = read_headers(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            err,
            MetopError::Format(FormatError::SecondaryHeaderCount(2))
        ));
    }

    #[test]
    fn test_single_line() {
        let product = product(ProductWriter::new(40), 1);
        assert_eq!(product.geometry().raster_height, 1);
        assert_eq!(product.geometry().trailing_lines_skipped, 0);
    }

    #[test]
    fn test_calibrated_reader_channel_checks() {
        let product = product(ProductWriter::new(20), 1);
        assert!(product.reflectance_reader(Channel::Ch3A).is_ok());
        assert!(product.temperature_reader(Channel::Ch4).is_ok());
        assert!(matches!(
            product.reflectance_reader(Channel::Ch4),
            Err(MetopError::InvalidArgument(_))
        ));
        assert!(matches!(
            product.temperature_reader(Channel::Ch2),
            Err(MetopError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_missing_calibration() {
        let product = product(ProductWriter::new(20).without_calibration(), 1);
        assert!(product.calibration().is_none());
        assert!(product.metadata().element("GIADR_RADIANCE").is_none());
        assert!(matches!(
            product.reflectance_reader(Channel::Ch1),
            Err(MetopError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_probe() {
        let writer = ProductWriter::new(20);
        let line = writer.blank_scan_line();
        let bytes = writer.scan_line(line).to_bytes().unwrap();
        assert!(probe(&mut Cursor::new(bytes.clone())).unwrap());

        let mut foreign = bytes;
        foreign[0] = 8;
        assert!(!probe(&mut Cursor::new(foreign)).unwrap());

        assert!(!probe(&mut Cursor::new(vec![1u8, 1, 0])).unwrap());
        assert!(!probe(&mut Cursor::new(Vec::new())).unwrap());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let writer = ProductWriter::new(20);
        let line = writer.blank_scan_line();
        let bytes = writer.scan_line(line).to_bytes().unwrap();
        let config = DecoderConfig {
            earth_sun_distance_ratio: Some(-1.0),
            ..DecoderConfig::default()
        };
        assert!(matches!(
            Product::open(Cursor::new(bytes), &config),
            Err(MetopError::ConfigError(_))
        ));
    }
}
