//! Calibrated bands: reflectance factors and brightness temperatures

use std::io::{Read, Seek};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::{fill_window, read_counts, BandReader, Channel, DataType, ReadStatus, Window};
use crate::calibration::Calibrator;
use crate::product::ProductGeometry;
use crate::stream::SharedStream;
use crate::Result;

/// Reads raw counts and calibrates them to `f32`; rows without data are `NaN`
#[derive(Debug, Clone)]
pub struct CalibratedReader<R> {
    stream: SharedStream<R>,
    geometry: Arc<ProductGeometry>,
    channel: Channel,
    calibrator: Calibrator,
}

impl<R> CalibratedReader<R> {
    pub(crate) fn new(
        stream: SharedStream<R>,
        geometry: Arc<ProductGeometry>,
        channel: Channel,
        calibrator: Calibrator,
    ) -> Self {
        Self {
            stream,
            geometry,
            channel,
            calibrator,
        }
    }

    /// Channel read by this reader
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Calibration applied to every sample
    #[must_use]
    pub fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }
}

impl<R: Read + Seek> BandReader for CalibratedReader<R> {
    type Sample = f32;

    fn band_name(&self) -> String {
        match self.calibrator {
            Calibrator::ReflectanceFactor { .. } => format!("reflectance_{}", self.channel.name()),
            Calibrator::RadianceToTemperature { .. } => format!("temp_{}", self.channel.name()),
        }
    }

    fn unit(&self) -> &str {
        self.calibrator.unit()
    }

    fn description(&self) -> String {
        format!(
            "{}, AVHRR/3 channel {} ({} um)",
            self.calibrator.quantity(),
            self.channel.name(),
            self.channel.wavelength()
        )
    }

    fn scaling_factor(&self) -> f64 {
        1.0
    }

    fn data_type(&self) -> DataType {
        DataType::Float32
    }

    fn read_window(&self, window: &Window, out: &mut [f32], cancel: &AtomicBool) -> Result<ReadStatus> {
        let geometry = &*self.geometry;
        let scale = self.channel.count_scale();
        let calibrator = self.calibrator;
        let mut bytes = vec![0u8; geometry.raster_width as usize * 2];
        fill_window(
            geometry,
            window,
            out,
            cancel,
            |raw_y, row| read_counts(&self.stream, geometry, self.channel, raw_y, &mut bytes, row),
            |count: i16| calibrator.calibrate(f64::from(count) * scale) as f32,
            f32::NAN,
        )
    }
}
