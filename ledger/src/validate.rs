use crate::errors::{Error, Result};
use crate::model::Reading;

const LAT_MIN: f64 = -90.0;
const LAT_MAX: f64 = 90.0;
const LON_MIN: f64 = -180.0;
const LON_MAX: f64 = 180.0;
const TEMP_MIN: f64 = -90.0;
const TEMP_MAX: f64 = 60.0;

/// Plausibility gate on incoming readings, ahead of the ledger's own
/// fixed-point width contract. Non-finite values fall through here and are
/// rejected by the encoder.
pub fn validate(reading: &Reading) -> Result<()> {
    // Validate latitude
    if reading.lat < LAT_MIN || reading.lat > LAT_MAX {
        return Err(Error::Validation(format!(
            "Latitude {} out of range [{}, {}]",
            reading.lat, LAT_MIN, LAT_MAX
        )));
    }

    // Validate longitude
    if reading.lon < LON_MIN || reading.lon > LON_MAX {
        return Err(Error::Validation(format!(
            "Longitude {} out of range [{}, {}]",
            reading.lon, LON_MIN, LON_MAX
        )));
    }

    // Validate temperature
    if reading.temp < TEMP_MIN || reading.temp > TEMP_MAX {
        return Err(Error::Validation(format!(
            "Temperature {} out of range [{}, {}]",
            reading.temp, TEMP_MIN, TEMP_MAX
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_reading() {
        let reading = Reading {
            lat: 40.7128,
            lon: -74.0060,
            temp: -18.0,
        };

        assert!(validate(&reading).is_ok());
    }

    #[test]
    fn test_invalid_latitude() {
        let reading = Reading {
            lat: 91.0, // Out of range
            lon: -74.0060,
            temp: -18.0,
        };

        assert!(validate(&reading).is_err());
    }

    #[test]
    fn test_invalid_longitude() {
        let reading = Reading {
            lat: 40.7128,
            lon: -181.0, // Out of range
            temp: -18.0,
        };

        assert!(validate(&reading).is_err());
    }

    #[test]
    fn test_invalid_temperature() {
        let reading = Reading {
            lat: 40.7128,
            lon: -74.0060,
            temp: 99.0, // Out of range
        };

        assert!(validate(&reading).is_err());
    }

    #[test]
    fn test_boundary_values_pass() {
        let reading = Reading {
            lat: 90.0,
            lon: -180.0,
            temp: -90.0,
        };

        assert!(validate(&reading).is_ok());
    }
}
