//! metop-avhrr - METOP AVHRR/3 Level-1B product decoder
//!
//! Opens EPS Level-1B products, exposes their headers as a metadata tree,
//! and reads pixel windows of raw radiances, reflectance factors,
//! brightness temperatures, quality flags and cloud information.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::atomic::AtomicBool;
//!
//! use metop_avhrr::{BandReader, Channel, DecoderConfig, Product, Window};
//!
//! # fn main() -> metop_avhrr::Result<()> {
//! let product = Product::open_path(Path::new("AVHR_xxx_1B.nat"), &DecoderConfig::default())?;
//! let reader = product.temperature_reader(Channel::Ch4)?;
//! let window = Window::new(0, 0, 64, 64);
//! let mut temperatures = vec![0.0f32; window.output_len()];
//! reader.read_window(&window, &mut temperatures, &AtomicBool::new(false))?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::field_reassign_with_default,
    clippy::multiple_crate_versions
)]

pub mod band;
pub mod calibration;
pub mod config;
pub mod error;
pub mod format;
pub mod product;
pub mod stream;

pub use band::{BandReader, Channel, DataType, ReadStatus, Window};
pub use calibration::Calibrator;
pub use config::{DecoderConfig, Orientation};
pub use error::{FieldError, FormatError, MetopError, Result};
pub use product::{can_open, probe, Product};
