//! Internal pointer records and the auxiliary records they reference

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, trace};

use super::giadr::{RadianceCalibration, GIADR_RADIANCE_SUBCLASS};
use super::header::{InstrumentGroup, RecordClass, RecordHeader, RECORD_HEADER_SIZE};
use crate::error::FormatError;
use crate::{MetopError, Result};

/// Minimum encoded size of an internal pointer record
pub const IPR_SIZE: u32 = 27;

/// Size of a free text payload following its record header
pub const FREE_TEXT_SIZE: usize = 100;

/// One internal pointer record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEntry {
    /// Header of the pointer record itself (IPR, GENERIC)
    pub header: RecordHeader,
    /// Class of the referenced record
    pub target_class: RecordClass,
    /// Instrument group of the referenced record
    pub target_group: InstrumentGroup,
    /// Subclass of the referenced record
    pub target_subclass: u8,
    /// Absolute offset of the referenced record
    pub target_offset: u32,
}

impl PointerEntry {
    /// Decode an entry from the current stream position
    ///
    /// # Errors
    ///
    /// Returns `InvalidPointerRecord` if the header is not a GENERIC IPR of
    /// at least [`IPR_SIZE`] bytes, a format error for unknown target class
    /// or group bytes, and I/O errors on short reads
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let header = RecordHeader::read_from(reader)?;
        if header.class != RecordClass::Ipr
            || header.instrument_group != InstrumentGroup::Generic
            || header.size < IPR_SIZE
        {
            return Err(FormatError::InvalidPointerRecord {
                class: header.class,
                group: header.instrument_group,
                size: header.size,
            }
            .into());
        }

        let target_class = RecordClass::from_u8(reader.read_u8()?)?;
        let target_group = InstrumentGroup::from_u8(reader.read_u8()?)?;
        let target_subclass = reader.read_u8()?;
        let target_offset = reader.read_u32::<BigEndian>()?;

        Ok(Self {
            header,
            target_class,
            target_group,
            target_subclass,
            target_offset,
        })
    }

    /// Build a pointer to a record at `target_offset`
    #[must_use]
    pub fn new(
        target_class: RecordClass,
        target_group: InstrumentGroup,
        target_subclass: u8,
        target_offset: u32,
    ) -> Self {
        Self {
            header: RecordHeader {
                class: RecordClass::Ipr,
                instrument_group: InstrumentGroup::Generic,
                subclass: 0,
                subclass_version: 0,
                size: IPR_SIZE,
                start_time: super::Timestamp::default(),
                end_time: super::Timestamp::default(),
            },
            target_class,
            target_group,
            target_subclass,
            target_offset,
        }
    }

    /// Encode the entry; pads the payload up to the declared header size
    ///
    /// # Errors
    ///
    /// Returns error if the writer fails
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.header.write_to(writer)?;
        writer.write_u8(self.target_class as u8)?;
        writer.write_u8(self.target_group as u8)?;
        writer.write_u8(self.target_subclass)?;
        writer.write_u32::<BigEndian>(self.target_offset)?;
        let padding = self.header.size.saturating_sub(IPR_SIZE) as usize;
        writer.write_all(&vec![0u8; padding])?;
        Ok(())
    }
}

/// Everything the pointer table yields at open time
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryRecords {
    /// Pointer entries in file order, the MDR pointer last
    pub entries: Vec<PointerEntry>,
    /// Offset of the first scan line
    pub first_mdr_offset: u64,
    /// Radiance calibration record, when the table points at one
    pub calibration: Option<RadianceCalibration>,
    /// Free text records by subclass. A repeated subclass overwrites the
    /// earlier text.
    pub free_texts: BTreeMap<u8, String>,
}

/// Walk the pointer table starting at `start` until the entry pointing at
/// the measurement data records, decoding every calibration and free text
/// record met on the way.
///
/// # Errors
///
/// Returns `MissingBulkRecordPointer` if the stream ends before the MDR
/// pointer, `InvalidPointerRecord` for a malformed entry, and
/// `InvalidCalibrationRecord` if a radiance calibration record is unreadable
pub fn read_pointer_table<R: Read + Seek>(reader: &mut R, start: u64) -> Result<AuxiliaryRecords> {
    let stream_len = reader.seek(SeekFrom::End(0))?;
    let mut records = AuxiliaryRecords::default();
    let mut position = start;

    loop {
        if position + u64::from(IPR_SIZE) > stream_len {
            return Err(FormatError::MissingBulkRecordPointer.into());
        }

        reader.seek(SeekFrom::Start(position))?;
        let entry = PointerEntry::read_from(reader)?;
        trace!(
            offset = position,
            target = ?entry.target_class,
            subclass = entry.target_subclass,
            target_offset = entry.target_offset,
            "pointer entry"
        );
        records.entries.push(entry);

        match entry.target_class {
            RecordClass::Mdr => {
                records.first_mdr_offset = u64::from(entry.target_offset);
                break;
            }
            RecordClass::Giadr if entry.target_subclass == GIADR_RADIANCE_SUBCLASS => {
                reader.seek(SeekFrom::Start(u64::from(entry.target_offset)))?;
                let calibration = RadianceCalibration::read_from(reader).map_err(|e| match e {
                    MetopError::Io(io) => MetopError::Format(
                        FormatError::InvalidCalibrationRecord(io.to_string()),
                    ),
                    other => other,
                })?;
                records.calibration = Some(calibration);
            }
            RecordClass::Giadr => {
                debug!(
                    subclass = entry.target_subclass,
                    offset = entry.target_offset,
                    "skipping internal auxiliary record"
                );
            }
            RecordClass::Geadr => {
                let (subclass, text) = read_free_text(reader, u64::from(entry.target_offset))?;
                if records.free_texts.insert(subclass, text).is_some() {
                    debug!(subclass, "free text subclass repeated, keeping the later one");
                }
            }
            _ => {}
        }

        position += u64::from(entry.header.size);
    }

    debug!(
        entries = records.entries.len(),
        first_mdr_offset = records.first_mdr_offset,
        free_texts = records.free_texts.len(),
        "pointer table read"
    );

    Ok(records)
}

fn read_free_text<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<(u8, String)> {
    reader.seek(SeekFrom::Start(offset))?;
    let header = RecordHeader::read_from(reader)?;
    let mut text = [0u8; FREE_TEXT_SIZE];
    reader.read_exact(&mut text)?;
    let text = String::from_utf8_lossy(&text)
        .trim_end_matches(['\0', ' '])
        .to_string();
    Ok((header.subclass, text))
}

/// Encoded size of a free text record, header included
pub(crate) const FREE_TEXT_RECORD_SIZE: u32 = RECORD_HEADER_SIZE as u32 + FREE_TEXT_SIZE as u32;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Timestamp;
    use std::io::Cursor;

    fn free_text_record(subclass: u8, text: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        RecordHeader {
            class: RecordClass::Geadr,
            instrument_group: InstrumentGroup::Generic,
            subclass,
            subclass_version: 1,
            size: FREE_TEXT_RECORD_SIZE,
            start_time: Timestamp::default(),
            end_time: Timestamp::default(),
        }
        .write_to(&mut bytes)
        .unwrap();
        let mut payload = text.as_bytes().to_vec();
        payload.resize(FREE_TEXT_SIZE, b' ');
        bytes.extend_from_slice(&payload);
        bytes
    }

    /// Lays out `pointers` at offset 0 followed by `records`, patching the
    /// target offsets to where each record lands
    fn build(pointers: &[(RecordClass, u8)], records: &[Vec<u8>]) -> Vec<u8> {
        let table_len = pointers.len() as u32 * IPR_SIZE;
        let mut offsets = Vec::new();
        let mut next = table_len;
        for record in records {
            offsets.push(next);
            next += record.len() as u32;
        }

        let mut bytes = Vec::new();
        let mut record_index = 0;
        for &(class, subclass) in pointers {
            let target = if class == RecordClass::Mdr {
                next
            } else {
                record_index += 1;
                offsets[record_index - 1]
            };
            PointerEntry::new(class, InstrumentGroup::Avhrr3, subclass, target)
                .write_to(&mut bytes)
                .unwrap();
        }
        for record in records {
            bytes.extend_from_slice(record);
        }
        bytes
    }

    #[test]
    fn test_entry_roundtrip() {
        let entry = PointerEntry::new(RecordClass::Giadr, InstrumentGroup::Avhrr3, 1, 4242);
        let mut bytes = Vec::new();
        entry.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), IPR_SIZE as usize);
        assert_eq!(PointerEntry::read_from(&mut Cursor::new(&bytes)).unwrap(), entry);
    }

    #[test]
    fn test_padded_entry_is_accepted() {
        let mut padded = PointerEntry::new(RecordClass::Veadr, InstrumentGroup::Avhrr3, 0, 999);
        padded.header.size = IPR_SIZE + 1;
        let mut bytes = Vec::new();
        padded.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), IPR_SIZE as usize + 1);
        PointerEntry::new(RecordClass::Mdr, InstrumentGroup::Avhrr3, 2, 1234)
            .write_to(&mut bytes)
            .unwrap();

        let records = read_pointer_table(&mut Cursor::new(&bytes), 0).unwrap();
        assert_eq!(records.entries.len(), 2);
        assert_eq!(records.first_mdr_offset, 1234);
    }

    #[test]
    fn test_walk_stops_at_mdr() {
        let calibration = {
            let mut bytes = Vec::new();
            RadianceCalibration::default().write_to(&mut bytes).unwrap();
            bytes
        };
        let bytes = build(
            &[
                (RecordClass::Geadr, 1),
                (RecordClass::Giadr, GIADR_RADIANCE_SUBCLASS),
                (RecordClass::Mdr, 2),
            ],
            &[free_text_record(1, "NOISE"), calibration],
        );

        let records = read_pointer_table(&mut Cursor::new(&bytes), 0).unwrap();
        assert_eq!(records.entries.len(), 3);
        assert_eq!(records.first_mdr_offset, bytes.len() as u64);
        assert_eq!(records.free_texts.get(&1).map(String::as_str), Some("NOISE"));
        let calibration = records.calibration.unwrap();
        assert_eq!(calibration.header.subclass, GIADR_RADIANCE_SUBCLASS);
        assert!((calibration.infrared[1].central_wavenumber - 927.2).abs() < 1e-9);
    }

    #[test]
    fn test_repeated_free_text_last_wins() {
        let bytes = build(
            &[
                (RecordClass::Geadr, 3),
                (RecordClass::Geadr, 3),
                (RecordClass::Mdr, 2),
            ],
            &[free_text_record(3, "first"), free_text_record(3, "second")],
        );

        let records = read_pointer_table(&mut Cursor::new(&bytes), 0).unwrap();
        assert_eq!(records.free_texts.len(), 1);
        assert_eq!(records.free_texts[&3], "second");
    }

    #[test]
    fn test_other_giadr_subclass_skipped() {
        let bytes = build(&[(RecordClass::Giadr, 7), (RecordClass::Mdr, 2)], &[]);
        let records = read_pointer_table(&mut Cursor::new(&bytes), 0).unwrap();
        assert!(records.calibration.is_none());
        assert_eq!(records.entries.len(), 2);
    }

    #[test]
    fn test_missing_mdr_pointer() {
        let bytes = build(&[(RecordClass::Veadr, 0)], &[vec![0u8; 4]]);
        let err = read_pointer_table(&mut Cursor::new(&bytes[..IPR_SIZE as usize]), 0).unwrap_err();
        assert!(matches!(
            err,
            MetopError::Format(FormatError::MissingBulkRecordPointer)
        ));
    }

    #[test]
    fn test_non_ipr_entry_rejected() {
        let mut bytes = Vec::new();
        let mut entry = PointerEntry::new(RecordClass::Mdr, InstrumentGroup::Avhrr3, 2, 0);
        entry.header.class = RecordClass::Sphr;
        entry.write_to(&mut bytes).unwrap();

        let err = read_pointer_table(&mut Cursor::new(&bytes), 0).unwrap_err();
        assert!(matches!(
            err,
            MetopError::Format(FormatError::InvalidPointerRecord {
                class: RecordClass::Sphr,
                ..
            })
        ));
    }

    #[test]
    fn test_undersized_entry_rejected() {
        let mut bytes = Vec::new();
        let mut entry = PointerEntry::new(RecordClass::Mdr, InstrumentGroup::Avhrr3, 2, 0);
        entry.header.size = 20;
        entry.write_to(&mut bytes).unwrap();

        let err = PointerEntry::read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(
            err,
            MetopError::Format(FormatError::InvalidPointerRecord { size: 20, .. })
        ));
    }

    #[test]
    fn test_unreadable_calibration_record() {
        let bytes = build(
            &[(RecordClass::Giadr, GIADR_RADIANCE_SUBCLASS), (RecordClass::Mdr, 2)],
            &[vec![RecordClass::Giadr as u8, 4, 1]],
        );
        let err = read_pointer_table(&mut Cursor::new(&bytes), 0).unwrap_err();
        assert!(matches!(
            err,
            MetopError::Format(FormatError::InvalidCalibrationRecord(_))
        ));
    }
}
