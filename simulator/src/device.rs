use rand::Rng;
use serde::Serialize;

/// Reading payload published to the ledger's readings topic.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Reading {
    pub lat: f64,
    pub lon: f64,
    pub temp: f64,
}

/// One simulated tracking device: drifts away from a base position and
/// reports cold-chain temperatures with occasional warm excursions.
#[derive(Debug)]
pub struct DeviceSim {
    pub address: String,
    lat: f64,
    lon: f64,
}

impl DeviceSim {
    pub fn new(index: usize, base_lat: f64, base_lon: f64) -> Self {
        DeviceSim {
            address: format!("0x{:040x}", index + 1),
            lat: base_lat,
            lon: base_lon,
        }
    }

    pub fn topic(&self) -> String {
        format!("readings/{}", self.address)
    }

    pub fn next_reading(&mut self, rng: &mut impl Rng) -> Reading {
        // slow north-east drift with jitter, roughly truck speed
        self.lat = (self.lat + rng.gen_range(-0.0005..0.0015)).clamp(-90.0, 90.0);
        self.lon = (self.lon + rng.gen_range(-0.0005..0.0015)).clamp(-180.0, 180.0);

        let temp = if rng.gen_bool(0.05) {
            rng.gen_range(-10.0..5.0) // door-open excursion
        } else {
            rng.gen_range(-19.5..-16.5) // reefer setpoint band
        };

        Reading {
            lat: self.lat,
            lon: self.lon,
            temp,
        }
    }
}
