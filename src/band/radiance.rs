//! Raw scene radiance counts

use std::io::{Read, Seek};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::{fill_window, read_counts, BandReader, Channel, DataType, ReadStatus, Window};
use crate::product::ProductGeometry;
use crate::stream::SharedStream;
use crate::Result;

/// No-data count for scan lines carrying the other channel 3 sub-channel
pub const RADIANCE_NO_DATA: i16 = 0;

/// Delivers raw `i16` counts; multiply by
/// [`scaling_factor`](BandReader::scaling_factor) for radiance
#[derive(Debug, Clone)]
pub struct RadianceReader<R> {
    stream: SharedStream<R>,
    geometry: Arc<ProductGeometry>,
    channel: Channel,
}

impl<R> RadianceReader<R> {
    pub(crate) fn new(stream: SharedStream<R>, geometry: Arc<ProductGeometry>, channel: Channel) -> Self {
        Self {
            stream,
            geometry,
            channel,
        }
    }

    /// Channel read by this reader
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }
}

impl<R: Read + Seek> BandReader for RadianceReader<R> {
    type Sample = i16;

    fn band_name(&self) -> String {
        format!("radiance_{}", self.channel.name())
    }

    fn unit(&self) -> &str {
        self.channel.radiance_unit()
    }

    fn description(&self) -> String {
        format!(
            "Earth scene radiance, AVHRR/3 channel {} ({} um)",
            self.channel.name(),
            self.channel.wavelength()
        )
    }

    fn scaling_factor(&self) -> f64 {
        self.channel.count_scale()
    }

    fn data_type(&self) -> DataType {
        DataType::Int16
    }

    fn read_window(&self, window: &Window, out: &mut [i16], cancel: &AtomicBool) -> Result<ReadStatus> {
        let geometry = &*self.geometry;
        let mut bytes = vec![0u8; geometry.raster_width as usize * 2];
        fill_window(
            geometry,
            window,
            out,
            cancel,
            |raw_y, row| read_counts(&self.stream, geometry, self.channel, raw_y, &mut bytes, row),
            |count| count,
            RADIANCE_NO_DATA,
        )
    }
}
