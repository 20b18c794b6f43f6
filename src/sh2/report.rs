//! Wire-adjacent data shapes the facade marshals to and from SH-2 reports.
//!
//! Decoding stops at "which report, what raw bytes" — concrete sensor report
//! decoding (turning those bytes into quaternions, accelerations, etc.) is a
//! non-goal of this crate (spec §1) and is the surrounding repository's job.

use crate::shtp::ShtpEvent;

/// Largest report body an input-report [`SensorEvent`] can carry
/// (`SH2_MAX_SENSOR_EVENT_LEN` in `original_source/sh2.h`).
pub const MAX_SENSOR_EVENT_LEN: usize = 60;

/// One reassembled input report, handed to the facade's sensor callback.
///
/// Mirrors `sh2_SensorEvent_t`. `report[..len]` holds the raw report bytes
/// starting at the report id; this crate does not decode them further.
#[derive(Clone, Copy)]
pub struct SensorEvent {
    pub timestamp_us: u64,
    pub delay_us: i64,
    pub report_id: u8,
    pub len: usize,
    pub report: [u8; MAX_SENSOR_EVENT_LEN],
}

impl SensorEvent {
    pub(crate) fn from_payload(payload: &[u8], timestamp_us: u64) -> Option<Self> {
        let report_id = *payload.first()?;
        let len = payload.len().min(MAX_SENSOR_EVENT_LEN);
        let mut report = [0u8; MAX_SENSOR_EVENT_LEN];
        report[..len].copy_from_slice(&payload[..len]);
        Some(SensorEvent {
            timestamp_us,
            delay_us: 0,
            report_id,
            len,
            report,
        })
    }

    /// The report's raw bytes, starting at the report id.
    pub fn report(&self) -> &[u8] {
        &self.report[..self.len]
    }
}

/// Cookie + function pointer pair for reassembled input reports on the
/// sensor-report channels (spec §4.6).
pub type SensorCallback = fn(cookie: *mut (), event: &SensorEvent);

/// Feature configuration for one sensor, mirroring `sh2_SensorConfig_t`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorConfig {
    pub change_sensitivity_enabled: bool,
    pub change_sensitivity_relative: bool,
    pub wakeup_enabled: bool,
    pub always_on_enabled: bool,
    pub sniff_enabled: bool,
    pub change_sensitivity: u16,
    pub report_interval_us: u32,
    pub batch_interval_us: u32,
    pub sensor_specific: u32,
}

impl SensorConfig {
    const FLAG_CHANGE_SENSITIVITY_ENABLED: u8 = 1 << 0;
    const FLAG_CHANGE_SENSITIVITY_RELATIVE: u8 = 1 << 1;
    const FLAG_WAKEUP_ENABLED: u8 = 1 << 2;
    const FLAG_ALWAYS_ON_ENABLED: u8 = 1 << 3;
    const FLAG_SNIFF_ENABLED: u8 = 1 << 4;

    fn flags(&self) -> u8 {
        let mut f = 0u8;
        if self.change_sensitivity_enabled {
            f |= Self::FLAG_CHANGE_SENSITIVITY_ENABLED;
        }
        if self.change_sensitivity_relative {
            f |= Self::FLAG_CHANGE_SENSITIVITY_RELATIVE;
        }
        if self.wakeup_enabled {
            f |= Self::FLAG_WAKEUP_ENABLED;
        }
        if self.always_on_enabled {
            f |= Self::FLAG_ALWAYS_ON_ENABLED;
        }
        if self.sniff_enabled {
            f |= Self::FLAG_SNIFF_ENABLED;
        }
        f
    }

    /// Encodes the 15-byte `SET_FEATURE_COMMAND` body that follows the
    /// report id and sensor id.
    pub(crate) fn encode(&self, out: &mut [u8; 15]) {
        out[0] = self.flags();
        out[1..3].copy_from_slice(&self.change_sensitivity.to_le_bytes());
        out[3..7].copy_from_slice(&self.report_interval_us.to_le_bytes());
        out[7..11].copy_from_slice(&self.batch_interval_us.to_le_bytes());
        out[11..15].copy_from_slice(&self.sensor_specific.to_le_bytes());
    }

    pub(crate) fn decode(body: &[u8; 15]) -> Self {
        let flags = body[0];
        SensorConfig {
            change_sensitivity_enabled: flags & Self::FLAG_CHANGE_SENSITIVITY_ENABLED != 0,
            change_sensitivity_relative: flags & Self::FLAG_CHANGE_SENSITIVITY_RELATIVE != 0,
            wakeup_enabled: flags & Self::FLAG_WAKEUP_ENABLED != 0,
            always_on_enabled: flags & Self::FLAG_ALWAYS_ON_ENABLED != 0,
            sniff_enabled: flags & Self::FLAG_SNIFF_ENABLED != 0,
            change_sensitivity: u16::from_le_bytes([body[1], body[2]]),
            report_interval_us: u32::from_le_bytes([body[3], body[4], body[5], body[6]]),
            batch_interval_us: u32::from_le_bytes([body[7], body[8], body[9], body[10]]),
            sensor_specific: u32::from_le_bytes([body[11], body[12], body[13], body[14]]),
        }
    }
}

/// Asynchronous, non-sensor events surfaced by the facade (spec §4.6,
/// `sh2_AsyncEvent_t`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AsyncEvent {
    /// Synthesized once when the executable channel reports reset complete.
    Reset,
    /// A transport-layer anomaly, passed through from the underlying
    /// [`crate::shtp::Session`]'s event callback.
    ShtpEvent(ShtpEvent),
    /// Response to [`crate::sh2::command::Command::GetFeature`].
    GetFeatureResp { sensor_id: u8, config: SensorConfig },
}

/// Cookie + function pointer pair for [`AsyncEvent`]s.
pub type AsyncEventCallback = fn(cookie: *mut (), event: &AsyncEvent);

/// Tare basis, mirroring `sh2_TareBasis_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TareBasis {
    RotationVector = 0,
    GamingRotationVector = 1,
    GeomagneticRotationVector = 2,
}

/// Tare axis bit flags, mirroring `sh2_TareAxis_t`'s `SH2_TARE_{X,Y,Z}`.
pub const TARE_X: u8 = 1;
pub const TARE_Y: u8 = 2;
pub const TARE_Z: u8 = 4;

/// Interactive ZRO motion intent, mirroring `sh2_IZroMotionIntent_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IZroMotionIntent {
    Unknown = 0,
    StationaryNoVibration = 1,
    StationaryWithVibration = 2,
    InMotion = 3,
    Accelerating = 4,
}

/// Double-precision quaternion, mirroring `sh2_Quaternion_t` (field order
/// `x, y, z, w`, distinct from the `(r, i, j, k)` convention used by
/// [`crate::euler`]).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}
