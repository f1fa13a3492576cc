//! Cloud information band

use std::io::{Read, Seek};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};

use super::{fill_window, BandReader, DataType, ReadStatus, Row, Window};
use crate::format::CLOUD_OFFSET;
use crate::product::ProductGeometry;
use crate::stream::SharedStream;
use crate::Result;

/// Delivers the per-pixel `u16` cloud information bits
#[derive(Debug, Clone)]
pub struct CloudReader<R> {
    stream: SharedStream<R>,
    geometry: Arc<ProductGeometry>,
}

impl<R> CloudReader<R> {
    pub(crate) fn new(stream: SharedStream<R>, geometry: Arc<ProductGeometry>) -> Self {
        Self { stream, geometry }
    }
}

impl<R: Read + Seek> BandReader for CloudReader<R> {
    type Sample = u16;

    fn band_name(&self) -> String {
        "cloud_flags".to_string()
    }

    fn unit(&self) -> &str {
        ""
    }

    fn description(&self) -> String {
        "Cloud information".to_string()
    }

    fn scaling_factor(&self) -> f64 {
        1.0
    }

    fn data_type(&self) -> DataType {
        DataType::UInt16
    }

    fn read_window(&self, window: &Window, out: &mut [u16], cancel: &AtomicBool) -> Result<ReadStatus> {
        let geometry = &*self.geometry;
        let row_offset = CLOUD_OFFSET + u64::from(geometry.trim_left) * 2;
        let mut bytes = vec![0u8; geometry.raster_width as usize * 2];
        fill_window(
            geometry,
            window,
            out,
            cancel,
            |raw_y, row| {
                self.stream.read_at(geometry.field_offset(raw_y, row_offset), &mut bytes)?;
                BigEndian::read_u16_into(&bytes, row);
                Ok(Row::Data)
            },
            |value| value,
            0,
        )
    }
}
