//! Generic record header (GRH), the 20 bytes in front of every record

use std::fmt;
use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};

use crate::error::FormatError;
use crate::Result;

/// Size of a generic record header in bytes
pub const RECORD_HEADER_SIZE: u64 = 20;

/// Seconds between the Unix epoch and the EPS epoch (2000-01-01T00:00:00Z)
const EPS_EPOCH_UNIX_SECONDS: i64 = 946_684_800;

const SECONDS_PER_DAY: i64 = 86_400;

/// Record class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordClass {
    /// Reserved
    Reserved = 0,
    /// Main product header record
    Mphr = 1,
    /// Secondary product header record
    Sphr = 2,
    /// Internal pointer record
    Ipr = 3,
    /// Global external auxiliary data record
    Geadr = 4,
    /// Global internal auxiliary data record
    Giadr = 5,
    /// Variable external auxiliary data record
    Veadr = 6,
    /// Variable internal auxiliary data record
    Viadr = 7,
    /// Measurement data record (one scan line)
    Mdr = 8,
}

impl RecordClass {
    /// Map a raw byte to a record class
    ///
    /// # Errors
    ///
    /// Returns `InvalidRecordClass` for bytes outside the known range
    pub fn from_u8(value: u8) -> std::result::Result<Self, FormatError> {
        Ok(match value {
            0 => Self::Reserved,
            1 => Self::Mphr,
            2 => Self::Sphr,
            3 => Self::Ipr,
            4 => Self::Geadr,
            5 => Self::Giadr,
            6 => Self::Veadr,
            7 => Self::Viadr,
            8 => Self::Mdr,
            other => return Err(FormatError::InvalidRecordClass(other)),
        })
    }
}

/// Instrument group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstrumentGroup {
    /// Instrument independent records
    Generic = 0,
    /// AMSU-A
    AmsuA = 1,
    /// ASCAT
    Ascat = 2,
    /// ATOVS
    Atovs = 3,
    /// AVHRR/3
    Avhrr3 = 4,
    /// GOME
    Gome = 5,
    /// GRAS
    Gras = 6,
    /// HIRS/4
    Hirs4 = 7,
    /// IASI
    Iasi = 8,
    /// MHS
    Mhs = 9,
    /// SEM
    Sem = 10,
    /// ADCS
    Adcs = 11,
    /// SBUV
    Sbuv = 12,
    /// Dummy
    Dummy = 13,
    /// Archive
    Archive = 14,
    /// IASI Level 2
    IasiL2 = 15,
}

impl InstrumentGroup {
    /// Map a raw byte to an instrument group
    ///
    /// # Errors
    ///
    /// Returns `InvalidInstrumentGroup` for bytes outside the known range
    pub fn from_u8(value: u8) -> std::result::Result<Self, FormatError> {
        Ok(match value {
            0 => Self::Generic,
            1 => Self::AmsuA,
            2 => Self::Ascat,
            3 => Self::Atovs,
            4 => Self::Avhrr3,
            5 => Self::Gome,
            6 => Self::Gras,
            7 => Self::Hirs4,
            8 => Self::Iasi,
            9 => Self::Mhs,
            10 => Self::Sem,
            11 => Self::Adcs,
            12 => Self::Sbuv,
            13 => Self::Dummy,
            14 => Self::Archive,
            15 => Self::IasiL2,
            other => return Err(FormatError::InvalidInstrumentGroup(other)),
        })
    }
}

/// Record time: days since 2000-01-01 plus time of day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Days since 2000-01-01
    pub days: u32,
    /// Whole seconds of the day
    pub seconds: u32,
    /// Microseconds within the second
    pub microseconds: u32,
}

impl Timestamp {
    /// Build from the on-disk day and milliseconds-of-day pair
    #[must_use]
    pub fn from_day_millis(day: u16, millis: u32) -> Self {
        Self {
            days: u32::from(day),
            seconds: millis / 1000,
            microseconds: (millis % 1000) * 1000,
        }
    }

    /// Milliseconds of the day, as stored on disk
    #[must_use]
    pub fn millis_of_day(&self) -> u32 {
        self.seconds * 1000 + self.microseconds / 1000
    }

    /// Convert to a UTC date-time
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let seconds = EPS_EPOCH_UNIX_SECONDS
            + i64::from(self.days) * SECONDS_PER_DAY
            + i64::from(self.seconds);
        DateTime::from_timestamp(seconds, self.microseconds * 1000)
    }

    /// Convert from a UTC date-time (millisecond precision)
    #[must_use]
    pub fn from_datetime(time: &DateTime<Utc>) -> Self {
        let since_epoch = time.timestamp() - EPS_EPOCH_UNIX_SECONDS;
        let days = since_epoch.div_euclid(SECONDS_PER_DAY);
        let seconds = since_epoch.rem_euclid(SECONDS_PER_DAY);
        Self {
            days: days.max(0) as u32,
            seconds: seconds as u32,
            microseconds: time.timestamp_subsec_millis() * 1000,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(time) => write!(f, "{}", time.format("%Y-%m-%dT%H:%M:%S%.6fZ")),
            None => write!(f, "day {} +{}.{:06}s", self.days, self.seconds, self.microseconds),
        }
    }
}

/// Generic record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record class
    pub class: RecordClass,
    /// Instrument group
    pub instrument_group: InstrumentGroup,
    /// Record subclass
    pub subclass: u8,
    /// Record subclass version
    pub subclass_version: u8,
    /// Record size in bytes, header included
    pub size: u32,
    /// Start of the sensing period covered by the record
    pub start_time: Timestamp,
    /// End of the sensing period covered by the record
    pub end_time: Timestamp,
}

impl RecordHeader {
    /// Decode a header from the current stream position.
    ///
    /// Consumes exactly 20 bytes on success. On failure the stream position
    /// is unspecified and callers must seek before reading again.
    ///
    /// # Errors
    ///
    /// Returns an I/O error on short reads and a format error for unknown
    /// class or instrument group bytes
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let class = RecordClass::from_u8(reader.read_u8()?)?;
        let instrument_group = InstrumentGroup::from_u8(reader.read_u8()?)?;
        let subclass = reader.read_u8()?;
        let subclass_version = reader.read_u8()?;
        let size = reader.read_u32::<BigEndian>()?;
        let start_day = reader.read_u16::<BigEndian>()?;
        let start_millis = reader.read_u32::<BigEndian>()?;
        let end_day = reader.read_u16::<BigEndian>()?;
        let end_millis = reader.read_u32::<BigEndian>()?;

        Ok(Self {
            class,
            instrument_group,
            subclass,
            subclass_version,
            size,
            start_time: Timestamp::from_day_millis(start_day, start_millis),
            end_time: Timestamp::from_day_millis(end_day, end_millis),
        })
    }

    /// Encode the header (20 bytes)
    ///
    /// # Errors
    ///
    /// Returns error if the writer fails
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.class as u8)?;
        writer.write_u8(self.instrument_group as u8)?;
        writer.write_u8(self.subclass)?;
        writer.write_u8(self.subclass_version)?;
        writer.write_u32::<BigEndian>(self.size)?;
        for time in [self.start_time, self.end_time] {
            writer.write_u16::<BigEndian>(time.days as u16)?;
            writer.write_u32::<BigEndian>(time.millis_of_day())?;
        }
        Ok(())
    }

    /// Size of the record payload following the header
    #[must_use]
    pub fn payload_size(&self) -> u64 {
        u64::from(self.size).saturating_sub(RECORD_HEADER_SIZE)
    }
}
