//! Navigation tie-point grids

use std::io::{Read, Seek};

use byteorder::{BigEndian, ByteOrder};
use tracing::debug;

use super::geometry::ProductGeometry;
use crate::format::TIE_POINT_OFFSET;
use crate::stream::SharedStream;
use crate::Result;

const ANGLE_SCALE: f32 = 1e-2;
const LOCATION_SCALE: f32 = 1e-4;

/// Names of the six navigation grids, in [`read_tie_point_grids`] order
pub const TIE_POINT_NAMES: [&str; 6] = [
    "sun_zenith",
    "view_zenith",
    "sun_azimuth",
    "view_azimuth",
    "latitude",
    "longitude",
];

const TIE_POINT_UNITS: [&str; 6] = ["deg"; 6];

/// Navigation values sampled every `subsampling` pixels and lines
#[derive(Debug, Clone, PartialEq)]
pub struct TiePointGrid {
    /// Grid name
    pub name: &'static str,
    /// Physical unit
    pub unit: &'static str,
    /// Points per grid row
    pub width: usize,
    /// Grid rows
    pub height: usize,
    /// Raster pixels between neighbouring points, in both directions
    pub subsampling: u32,
    /// Row-major values
    pub data: Vec<f32>,
}

impl TiePointGrid {
    /// Value at grid column `x`, row `y`
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }
}

/// Read the six navigation grids, one navigation line every
/// `navigation_sample_rate` scan lines. Mirrored products get mirrored grids
/// so grid points stay aligned with band pixels.
///
/// # Errors
///
/// Returns error if a navigation block cannot be read
pub fn read_tie_point_grids<R: Read + Seek>(
    stream: &SharedStream<R>,
    geometry: &ProductGeometry,
) -> Result<Vec<TiePointGrid>> {
    let rate = geometry.navigation_sample_rate.max(1);
    let width = geometry.navigation_points as usize;
    let height = (geometry.raster_height / rate + 1) as usize;
    let mut grids: Vec<Vec<f32>> = vec![Vec::with_capacity(width * height); TIE_POINT_NAMES.len()];

    let angle_bytes = width * 4 * 2;
    let mut block = vec![0u8; geometry.navigation_block_size()];
    let mut angles = vec![0i16; width * 4];
    let mut locations = vec![0i32; width * 2];

    for raw_y in (0..geometry.raster_height).step_by(rate as usize) {
        stream.read_at(geometry.field_offset(raw_y, TIE_POINT_OFFSET), &mut block)?;
        BigEndian::read_i16_into(&block[..angle_bytes], &mut angles);
        BigEndian::read_i32_into(&block[angle_bytes..], &mut locations);

        for point in 0..width {
            for (index, grid) in grids[..4].iter_mut().enumerate() {
                grid.push(f32::from(angles[point * 4 + index]) * ANGLE_SCALE);
            }
            for (index, grid) in grids[4..].iter_mut().enumerate() {
                grid.push(locations[point * 2 + index] as f32 * LOCATION_SCALE);
            }
        }
    }

    if geometry.mirrored {
        for grid in &mut grids {
            grid.reverse();
        }
    }

    debug!(width, height, rate, "tie point grids read");

    Ok(TIE_POINT_NAMES
        .into_iter()
        .zip(TIE_POINT_UNITS)
        .zip(grids)
        .map(|((name, unit), data)| TiePointGrid {
            name,
            unit,
            width,
            height,
            subsampling: rate,
            data,
        })
        .collect())
}
