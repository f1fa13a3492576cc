//! Raster geometry derived from the headers and the first and last scan lines

use crate::band::Window;
use crate::error::FormatError;
use crate::format::{
    field_offset, EXPECTED_PRODUCT_WIDTH, FRAME_INDICATOR_OFFSET, HIGH_PRECISION_NAV_POINTS,
    LOW_PRECISION_NAV_POINTS, NAV_POINT_SIZE, TIE_POINT_OFFSET,
};

/// Navigation sample rate of high precision products
pub const HIGH_PRECISION_SAMPLE_RATE: u32 = 20;

/// Navigation sample rate of low precision products
pub const LOW_PRECISION_SAMPLE_RATE: u32 = 40;

/// Which sub-channel occupies the shared channel 3 row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel3 {
    /// Channel 3A (1.6 um) on every scan line
    A,
    /// Channel 3B (3.7 um) on every scan line
    B,
    /// Switches during the product; decided per scan line
    Mixed,
}

impl Channel3 {
    /// Classify from the frame indicator flag of the first and last line
    #[must_use]
    pub fn from_flags(first_is_3a: bool, last_is_3a: bool) -> Self {
        match (first_is_3a, last_is_3a) {
            (true, true) => Self::A,
            (false, false) => Self::B,
            _ => Self::Mixed,
        }
    }
}

/// Pixel and navigation layout selected by the navigation sample rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationLayout {
    /// Navigation sample rate in pixels and lines
    pub sample_rate: u32,
    /// Pixels cut on the left to align with the first navigation point
    pub trim_left: u32,
    /// Width of the delivered raster
    pub raster_width: u32,
    /// Navigation points per scan line
    pub nav_points: u32,
}

impl NavigationLayout {
    /// Layout for the `NAV_SAMPLE_RATE` header value
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedSampleRate` for anything but 20 or 40
    pub fn from_sample_rate(sample_rate: i64) -> Result<Self, FormatError> {
        match sample_rate {
            20 => Ok(Self {
                sample_rate: HIGH_PRECISION_SAMPLE_RATE,
                trim_left: 4,
                raster_width: 2041,
                nav_points: HIGH_PRECISION_NAV_POINTS,
            }),
            40 => Ok(Self {
                sample_rate: LOW_PRECISION_SAMPLE_RATE,
                trim_left: 24,
                raster_width: 2001,
                nav_points: LOW_PRECISION_NAV_POINTS,
            }),
            other => Err(FormatError::UnsupportedSampleRate(other)),
        }
    }

    /// Whether scan lines carry the 103 point navigation
    #[must_use]
    pub fn is_high_precision(&self) -> bool {
        self.nav_points == HIGH_PRECISION_NAV_POINTS
    }

    /// Pixels cut on the right
    #[must_use]
    pub fn trim_right(&self) -> u32 {
        EXPECTED_PRODUCT_WIDTH - self.trim_left - self.raster_width
    }
}

/// Scan line count after truncation and tail correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightCorrection {
    /// Lines delivered
    pub height: u32,
    /// Complete lines removed from the end so the raster ends on a
    /// navigation line
    pub trailing_lines_skipped: u32,
    /// Whether the stream length disagreed with the declared line count
    pub truncated: bool,
}

/// Correct the declared scan line count against the stream length.
///
/// When `anchor + declared * stride` is not the stream length, the count is
/// recomputed from the stream. Then trailing lines are dropped until
/// `height % sample_rate == 1`, so the last line is a navigation line.
///
/// # Errors
///
/// Returns `NoCompleteScanLines` if nothing is left
pub fn correct_height(
    declared: i64,
    anchor: u64,
    stride: u64,
    stream_len: u64,
    sample_rate: u32,
) -> Result<HeightCorrection, FormatError> {
    let expected_len = i128::from(anchor) + i128::from(declared) * i128::from(stride);
    let truncated = expected_len != i128::from(stream_len);
    let available = if truncated {
        (stream_len.saturating_sub(anchor) / stride.max(1)) as i64
    } else {
        declared
    };

    let rate = i64::from(sample_rate.max(1));
    let to_skip = ((available % rate) - 1).rem_euclid(rate);
    let height = available - to_skip;
    if height < 1 {
        return Err(FormatError::NoCompleteScanLines {
            available,
            sample_rate,
        });
    }

    Ok(HeightCorrection {
        height: u32::try_from(height).map_err(|_| FormatError::NoCompleteScanLines {
            available,
            sample_rate,
        })?,
        trailing_lines_skipped: to_skip as u32,
        truncated,
    })
}

/// Requested window mapped onto file coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCoordinates {
    /// First file column (trim included)
    pub min_x: u32,
    /// Last file column (trim included)
    pub max_x: u32,
    /// First scan line
    pub min_y: u32,
    /// Last scan line
    pub max_y: u32,
    /// Output index of the first raw pixel
    pub target_start: usize,
    /// Output index step per raw pixel, `1` or `-1`
    pub target_increment: isize,
}

/// Geometry of an opened product. Immutable once the product is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductGeometry {
    /// Delivered raster width
    pub raster_width: u32,
    /// Delivered raster height
    pub raster_height: u32,
    /// Pixels cut on the left
    pub trim_left: u32,
    /// Pixels cut on the right
    pub trim_right: u32,
    /// Navigation sample rate
    pub navigation_sample_rate: u32,
    /// Navigation points per scan line
    pub navigation_points: u32,
    /// Bytes per scan line record
    pub scan_line_stride: u64,
    /// Offset of the first scan line record
    pub first_scan_line_offset: u64,
    /// Whether scan lines carry the 103 point navigation
    pub high_precision: bool,
    /// Whether the satellite moves north during the product
    pub ascending: bool,
    /// Whether rows and columns are delivered reversed
    pub mirrored: bool,
    /// Channel 3 usage
    pub channel_3: Channel3,
    /// Complete scan lines dropped from the end
    pub trailing_lines_skipped: u32,
}

impl ProductGeometry {
    /// Offset of scan line `raw_y`
    #[must_use]
    pub fn scan_line_offset(&self, raw_y: u32) -> u64 {
        self.first_scan_line_offset + u64::from(raw_y) * self.scan_line_stride
    }

    /// Offset of a field of scan line `raw_y`, given its high precision
    /// offset within the record
    #[must_use]
    pub fn field_offset(&self, raw_y: u32, offset: u64) -> u64 {
        self.scan_line_offset(raw_y) + field_offset(offset, self.high_precision)
    }

    /// Offset of the byte holding the channel 3A/3B bit of scan line `raw_y`
    #[must_use]
    pub fn frame_flag_offset(&self, raw_y: u32) -> u64 {
        self.field_offset(raw_y, FRAME_INDICATOR_OFFSET) + 1
    }

    /// Offset of the latitude of navigation point `point` on scan line `raw_y`
    #[must_use]
    pub fn latitude_offset(&self, raw_y: u32, point: u32) -> u64 {
        self.field_offset(raw_y, TIE_POINT_OFFSET)
            + u64::from(self.navigation_points) * 8
            + u64::from(point) * 8
    }

    /// Bytes of navigation data per scan line
    #[must_use]
    pub fn navigation_block_size(&self) -> usize {
        (u64::from(self.navigation_points) * NAV_POINT_SIZE) as usize
    }

    /// Map a requested window onto file coordinates.
    ///
    /// Callers must have checked the window against the raster bounds.
    /// The target indices address the window's output buffer, so stepped
    /// windows start from their subsampled size.
    #[must_use]
    pub fn raw_coordinates(&self, window: &Window) -> RawCoordinates {
        let Window {
            x,
            y,
            width,
            height,
            ..
        } = *window;
        let mut coordinates = if self.mirrored {
            RawCoordinates {
                min_x: self.raster_width - x - width,
                max_x: self.raster_width - x - 1,
                min_y: self.raster_height - y - height,
                max_y: self.raster_height - y - 1,
                target_start: window.output_len().saturating_sub(1),
                target_increment: -1,
            }
        } else {
            RawCoordinates {
                min_x: x,
                max_x: x + width - 1,
                min_y: y,
                max_y: y + height - 1,
                target_start: 0,
                target_increment: 1,
            }
        };
        coordinates.min_x += self.trim_left;
        coordinates.max_x += self.trim_left;
        coordinates
    }
}
