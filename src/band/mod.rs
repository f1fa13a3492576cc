//! Band readers
//!
//! Every reader maps a requested pixel window onto the scan line records,
//! reads each needed scan line with one locked seek and read, and fills the
//! caller's buffer. Mirrored products fill the buffer back to front.

mod calibrated;
mod cloud;
mod flags;
mod radiance;

pub use calibrated::CalibratedReader;
pub use cloud::CloudReader;
pub use flags::{FlagDefinition, FlagReader, FLAG_CODING};
pub use radiance::RadianceReader;

use std::io::{Read, Seek};
use std::sync::atomic::{AtomicBool, Ordering};

use byteorder::{BigEndian, ByteOrder};
use tracing::trace;

use crate::format::{EXPECTED_PRODUCT_WIDTH, SCENE_RADIANCE_OFFSET};
use crate::product::{Channel3, ProductGeometry};
use crate::stream::SharedStream;
use crate::{MetopError, Result};

/// AVHRR/3 channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// 0.63 um
    Ch1,
    /// 0.865 um
    Ch2,
    /// 1.61 um
    Ch3A,
    /// 3.74 um
    Ch3B,
    /// 10.8 um
    Ch4,
    /// 12.0 um
    Ch5,
}

impl Channel {
    /// All channels
    pub const ALL: [Channel; 6] = [
        Self::Ch1,
        Self::Ch2,
        Self::Ch3A,
        Self::Ch3B,
        Self::Ch4,
        Self::Ch5,
    ];

    /// Short channel name used in band names
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ch1 => "1",
            Self::Ch2 => "2",
            Self::Ch3A => "3a",
            Self::Ch3B => "3b",
            Self::Ch4 => "4",
            Self::Ch5 => "5",
        }
    }

    /// Central wavelength in um
    #[must_use]
    pub fn wavelength(self) -> f64 {
        match self {
            Self::Ch1 => 0.63,
            Self::Ch2 => 0.865,
            Self::Ch3A => 1.61,
            Self::Ch3B => 3.74,
            Self::Ch4 => 10.8,
            Self::Ch5 => 12.0,
        }
    }

    /// Row of the scene radiance block holding this channel
    #[must_use]
    pub fn radiance_row(self) -> usize {
        match self {
            Self::Ch1 => 0,
            Self::Ch2 => 1,
            Self::Ch3A | Self::Ch3B => 2,
            Self::Ch4 => 3,
            Self::Ch5 => 4,
        }
    }

    /// Factor turning a raw count into radiance
    #[must_use]
    pub fn count_scale(self) -> f64 {
        match self {
            Self::Ch3B => 1e-4,
            _ => 1e-2,
        }
    }

    /// Index into the visible calibration coefficients (channels 1, 2, 3A)
    #[must_use]
    pub fn visible_index(self) -> Option<usize> {
        match self {
            Self::Ch1 => Some(0),
            Self::Ch2 => Some(1),
            Self::Ch3A => Some(2),
            _ => None,
        }
    }

    /// Index into the infrared calibration coefficients (channels 3B, 4, 5)
    #[must_use]
    pub fn infrared_index(self) -> Option<usize> {
        match self {
            Self::Ch3B => Some(0),
            Self::Ch4 => Some(1),
            Self::Ch5 => Some(2),
            _ => None,
        }
    }

    /// Radiance unit
    #[must_use]
    pub fn radiance_unit(self) -> &'static str {
        if self.visible_index().is_some() {
            "W/(m^2 sr um)"
        } else {
            "mW/(m^2 sr cm^-1)"
        }
    }

    /// Whether the channel shares the channel 3 row
    #[must_use]
    pub fn is_channel_3(self) -> bool {
        matches!(self, Self::Ch3A | Self::Ch3B)
    }
}

/// Element type of a band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Unsigned 8 bit
    UInt8,
    /// Signed 16 bit
    Int16,
    /// Unsigned 16 bit
    UInt16,
    /// 32 bit float
    Float32,
}

/// Outcome of a window read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Every output sample was written
    Complete,
    /// Cancelled between rows; rows written so far are valid
    Cancelled,
}

/// Requested pixel window in delivered raster coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Left column
    pub x: u32,
    /// Top row
    pub y: u32,
    /// Columns covered
    pub width: u32,
    /// Rows covered
    pub height: u32,
    /// Column step
    pub step_x: u32,
    /// Row step
    pub step_y: u32,
}

impl Window {
    /// Window read at full resolution
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            step_x: 1,
            step_y: 1,
        }
    }

    /// Same window, every `step_x`-th column and `step_y`-th row
    #[must_use]
    pub fn with_step(mut self, step_x: u32, step_y: u32) -> Self {
        self.step_x = step_x;
        self.step_y = step_y;
        self
    }

    /// Output columns
    #[must_use]
    pub fn output_width(&self) -> usize {
        self.width.div_ceil(self.step_x.max(1)) as usize
    }

    /// Output rows
    #[must_use]
    pub fn output_height(&self) -> usize {
        self.height.div_ceil(self.step_y.max(1)) as usize
    }

    /// Output samples
    #[must_use]
    pub fn output_len(&self) -> usize {
        self.output_width() * self.output_height()
    }

    fn validate(&self, geometry: &ProductGeometry, buffer_len: usize) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.step_x == 0 || self.step_y == 0 {
            return Err(MetopError::InvalidArgument(format!(
                "empty window or zero step: {self:?}"
            )));
        }
        if u64::from(self.x) + u64::from(self.width) > u64::from(geometry.raster_width)
            || u64::from(self.y) + u64::from(self.height) > u64::from(geometry.raster_height)
        {
            return Err(MetopError::InvalidArgument(format!(
                "window {self:?} exceeds raster {}x{}",
                geometry.raster_width, geometry.raster_height
            )));
        }
        if buffer_len != self.output_len() {
            return Err(MetopError::InvalidArgument(format!(
                "buffer holds {buffer_len} samples, window needs {}",
                self.output_len()
            )));
        }
        Ok(())
    }
}

/// Reads windows of one band
pub trait BandReader {
    /// Element type delivered to the caller
    type Sample: Copy;

    /// Band name
    fn band_name(&self) -> String;

    /// Physical unit of the delivered (scaled) values
    fn unit(&self) -> &str;

    /// Human readable description
    fn description(&self) -> String;

    /// Factor turning delivered samples into physical values
    fn scaling_factor(&self) -> f64;

    /// Element type
    fn data_type(&self) -> DataType;

    /// Read `window` into `out`, row-major at the window's output size.
    ///
    /// `cancel` is checked before every output row.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for windows outside the raster or a buffer
    /// of the wrong size, and I/O errors from the stream
    fn read_window(
        &self,
        window: &Window,
        out: &mut [Self::Sample],
        cancel: &AtomicBool,
    ) -> Result<ReadStatus>;
}

/// Whether a raw row has data or carries the other channel 3 sub-channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Data,
    NoData,
}

/// Drive a window read.
///
/// `read_row(raw_y, row)` fills `row` with the delivered raster width of
/// scan line `raw_y`, starting at the trimmed left edge. `convert` maps a
/// row sample to the output type; `no_data` fills rows without data.
fn fill_window<S, T>(
    geometry: &ProductGeometry,
    window: &Window,
    out: &mut [T],
    cancel: &AtomicBool,
    mut read_row: impl FnMut(u32, &mut [S]) -> Result<Row>,
    convert: impl Fn(S) -> T,
    no_data: T,
) -> Result<ReadStatus>
where
    S: Copy + Default,
    T: Copy,
{
    window.validate(geometry, out.len())?;

    let raw = geometry.raw_coordinates(window);
    let dest_width = window.output_width() as u32;
    let dest_height = window.output_height() as u32;

    // Walk raw coordinates ascending; mirrored windows start so that the
    // last raw sample lands on the requested corner
    let (first_x, first_y) = if geometry.mirrored {
        (
            raw.max_x - (dest_width - 1) * window.step_x,
            raw.max_y - (dest_height - 1) * window.step_y,
        )
    } else {
        (raw.min_x, raw.min_y)
    };

    let mut row = vec![S::default(); geometry.raster_width as usize];
    let mut target = raw.target_start as isize;

    for row_index in 0..dest_height {
        if cancel.load(Ordering::Relaxed) {
            trace!(row = row_index, "window read cancelled");
            return Ok(ReadStatus::Cancelled);
        }

        let raw_y = first_y + row_index * window.step_y;
        let state = read_row(raw_y, &mut row)?;

        for column in 0..dest_width {
            let raw_x = first_x + column * window.step_x - geometry.trim_left;
            out[target as usize] = match state {
                Row::Data => convert(row[raw_x as usize]),
                Row::NoData => no_data,
            };
            target += raw.target_increment;
        }
    }

    Ok(ReadStatus::Complete)
}

/// Whether scan line `raw_y` carries `channel`
fn channel_present<R: Read + Seek>(
    stream: &SharedStream<R>,
    geometry: &ProductGeometry,
    channel: Channel,
    raw_y: u32,
) -> Result<bool> {
    if !channel.is_channel_3() {
        return Ok(true);
    }

    let line_is_3a = match geometry.channel_3 {
        Channel3::A => true,
        Channel3::B => false,
        Channel3::Mixed => stream.read_u8_at(geometry.frame_flag_offset(raw_y))? & 1 == 1,
    };
    Ok(line_is_3a == (channel == Channel::Ch3A))
}

/// Read the raw counts of `channel` on scan line `raw_y` into `row`
fn read_counts<R: Read + Seek>(
    stream: &SharedStream<R>,
    geometry: &ProductGeometry,
    channel: Channel,
    raw_y: u32,
    bytes: &mut [u8],
    row: &mut [i16],
) -> Result<Row> {
    if !channel_present(stream, geometry, channel, raw_y)? {
        return Ok(Row::NoData);
    }

    let row_offset = SCENE_RADIANCE_OFFSET
        + (channel.radiance_row() as u64 * u64::from(EXPECTED_PRODUCT_WIDTH)
            + u64::from(geometry.trim_left))
            * 2;
    stream.read_at(geometry.field_offset(raw_y, row_offset), bytes)?;
    BigEndian::read_i16_into(bytes, row);
    Ok(Row::Data)
}
