//! Status uplink framing
//!
//! Fixed-order concatenation of big-endian fields, decoded downstream by a
//! fixed-format decoder:
//!
//! | Field | Size |
//! |---|---|
//! | charging flag | 1 |
//! | battery millivolts | 2 |
//! | battery percent | 1 |
//! | bus millivolts, `0` if unavailable | 2 |
//! | temperature, humidity, pressure (hPa), altitude | 4 each, IEEE-754, optional |

use core::fmt;

use heapless::Vec;

/// Largest status uplink
pub const MAX_UPLINK_LEN: usize = 52;
/// Length of the battery header
pub const HEADER_LEN: usize = 6;
/// Standard atmosphere at sea level, in hPa
pub const DEFAULT_SEA_LEVEL_HPA: f32 = 1013.25;

/// Payload builder error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Field would exceed [`MAX_UPLINK_LEN`]
    Full,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Full => f.write_str("uplink payload full"),
        }
    }
}

/// Power status reported by the battery gauge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryStatus {
    /// Battery is charging
    pub charging: bool,
    /// Battery voltage in millivolts
    pub battery_mv: u16,
    /// Charge level, 0-100
    pub battery_pct: u8,
    /// External bus voltage in millivolts, if the board can measure it
    pub bus_mv: Option<u16>,
}

/// Environmental readings; absent fields are left out of the frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Environment {
    /// Temperature in degrees Celsius
    pub temperature: Option<f32>,
    /// Relative humidity in percent
    pub humidity: Option<f32>,
    /// Atmospheric pressure in hPa
    pub pressure_hpa: Option<f32>,
    /// Altitude in meters
    pub altitude: Option<f32>,
}

impl Environment {
    /// Barometric altitude in meters for a pressure reading in Pa
    pub fn altitude_from_pressure(pressure_pa: f32, sea_level_hpa: f32) -> f32 {
        44330.0 * (1.0 - libm::powf((pressure_pa / 100.0) / sea_level_hpa, 0.1903))
    }

    /// Set pressure and the altitude derived from it, from a reading in Pa
    pub fn with_pressure_pa(mut self, pressure_pa: f32) -> Self {
        self.pressure_hpa = Some(pressure_pa / 100.0);
        self.altitude = Some(Self::altitude_from_pressure(
            pressure_pa,
            DEFAULT_SEA_LEVEL_HPA,
        ));
        self
    }
}

/// Status uplink payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UplinkPayload {
    buf: Vec<u8, MAX_UPLINK_LEN>,
}

impl UplinkPayload {
    /// Start a payload with the battery header
    pub fn new(battery: &BatteryStatus) -> Self {
        let mut header = [0u8; HEADER_LEN];
        header[0] = battery.charging as u8;
        header[1..3].copy_from_slice(&battery.battery_mv.to_be_bytes());
        header[3] = battery.battery_pct;
        header[4..6].copy_from_slice(&battery.bus_mv.unwrap_or(0).to_be_bytes());

        let mut buf = Vec::new();
        // HEADER_LEN < MAX_UPLINK_LEN
        let _ = buf.extend_from_slice(&header);
        Self { buf }
    }

    /// Append one big-endian float field
    pub fn push_f32(&mut self, value: f32) -> Result<(), PayloadError> {
        self.buf
            .extend_from_slice(&value.to_be_bytes())
            .map_err(|_| PayloadError::Full)
    }

    /// Append the environmental fields present, in frame order
    pub fn with_environment(mut self, env: &Environment) -> Result<Self, PayloadError> {
        let fields = [env.temperature, env.humidity, env.pressure_hpa, env.altitude];
        for value in fields.into_iter().flatten() {
            self.push_f32(value)?;
        }
        Ok(self)
    }

    /// Encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Encoded length
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been encoded
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl AsRef<[u8]> for UplinkPayload {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
