//! Radiometric calibration of scaled radiance counts
//!
//! Both variants are plain values. A calibrator is built once per band
//! reader from the decoded calibration record and is shared read-only by
//! every thread that reads through that reader.

use std::f64::consts::PI;

/// First radiation constant, mW/(m^2 sr cm^-4)
pub const C1: f64 = 1.191_042_7e-5;

/// Second radiation constant, K cm
pub const C2: f64 = 1.438_775_2;

/// Converts scene radiance into a physical quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Calibrator {
    /// Visible and near infrared channels (1, 2, 3A)
    ReflectanceFactor {
        /// Solar filtered irradiance of the channel, W/m^2
        solar_irradiance: f64,
        /// Earth-sun distance in astronomical units
        earth_sun_distance_ratio: f64,
    },
    /// Thermal infrared channels (3B, 4, 5)
    RadianceToTemperature {
        /// Band correction offset (K)
        constant1: f64,
        /// Band correction slope
        constant2: f64,
        /// Central wavenumber of the channel, cm^-1
        central_wavenumber: f64,
    },
}

impl Calibrator {
    /// Calibrate one scaled radiance value.
    ///
    /// Never fails: values that have no physical answer (zero irradiance,
    /// non-positive radiance for a temperature, zero slope) become `NaN`.
    #[must_use]
    pub fn calibrate(&self, radiance: f64) -> f64 {
        match *self {
            Self::ReflectanceFactor {
                solar_irradiance,
                earth_sun_distance_ratio,
            } => {
                if solar_irradiance == 0.0 {
                    return f64::NAN;
                }
                radiance * PI * earth_sun_distance_ratio * earth_sun_distance_ratio
                    / solar_irradiance
            }
            Self::RadianceToTemperature {
                constant1,
                constant2,
                central_wavenumber,
            } => {
                if radiance <= 0.0 || constant2 == 0.0 {
                    return f64::NAN;
                }
                let nu = central_wavenumber;
                let effective = C2 * nu / (1.0 + C1 * nu * nu * nu / radiance).ln();
                (effective - constant1) / constant2
            }
        }
    }

    /// Physical unit of the calibrated value
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            Self::ReflectanceFactor { .. } => "dl",
            Self::RadianceToTemperature { .. } => "K",
        }
    }

    /// Short name of the calibrated quantity
    #[must_use]
    pub fn quantity(&self) -> &'static str {
        match self {
            Self::ReflectanceFactor { .. } => "reflectance factor",
            Self::RadianceToTemperature { .. } => "brightness temperature",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_4() -> Calibrator {
        Calibrator::RadianceToTemperature {
            constant1: 0.55126,
            constant2: 0.998509,
            central_wavenumber: 927.2,
        }
    }

    fn planck(temperature: f64, nu: f64) -> f64 {
        C1 * nu.powi(3) / ((C2 * nu / temperature).exp() - 1.0)
    }

    #[test]
    fn test_zero_radiance_is_zero_reflectance() {
        let calibrator = Calibrator::ReflectanceFactor {
            solar_irradiance: 139.0,
            earth_sun_distance_ratio: 1.0,
        };
        assert_eq!(calibrator.calibrate(0.0), 0.0);
    }

    #[test]
    fn test_reflectance_formula() {
        let calibrator = Calibrator::ReflectanceFactor {
            solar_irradiance: 232.0,
            earth_sun_distance_ratio: 1.5,
        };
        let expected = 50.0 * PI * 2.25 / 232.0;
        assert!((calibrator.calibrate(50.0) - expected).abs() < 1e-12);
        assert_eq!(calibrator.unit(), "dl");
    }

    #[test]
    fn test_zero_irradiance_is_nan() {
        let calibrator = Calibrator::ReflectanceFactor {
            solar_irradiance: 0.0,
            earth_sun_distance_ratio: 1.0,
        };
        assert!(calibrator.calibrate(10.0).is_nan());
    }

    #[test]
    fn test_inverse_planck() {
        let identity = Calibrator::RadianceToTemperature {
            constant1: 0.0,
            constant2: 1.0,
            central_wavenumber: 927.2,
        };
        let radiance = planck(290.0, 927.2);
        assert!((identity.calibrate(radiance) - 290.0).abs() < 1e-9);

        let corrected = channel_4().calibrate(radiance);
        assert!((corrected - (290.0 - 0.55126) / 0.998509).abs() < 1e-9);
        assert_eq!(channel_4().unit(), "K");
    }

    #[test]
    fn test_temperature_monotonic() {
        let calibrator = channel_4();
        let mut previous = f64::NEG_INFINITY;
        for step in 1..=2000 {
            let radiance = f64::from(step) * 0.1;
            let temperature = calibrator.calibrate(radiance);
            assert!(temperature > previous, "not increasing at {radiance}");
            previous = temperature;
        }
    }

    #[test]
    fn test_temperature_nan_policy() {
        assert!(channel_4().calibrate(0.0).is_nan());
        assert!(channel_4().calibrate(-3.0).is_nan());

        let flat = Calibrator::RadianceToTemperature {
            constant1: 0.5,
            constant2: 0.0,
            central_wavenumber: 927.2,
        };
        assert!(flat.calibrate(90.0).is_nan());
    }
}
