//! Serialization of the documented SH-2 commands (spec §4.6) onto the
//! control channel.
//!
//! Three report families are in play, matching `original_source/sh2.h`'s
//! function list:
//! - `GET_FEATURE_REQUEST` (0xFE) / `SET_FEATURE_COMMAND` (0xFD): their own
//!   report types, not wrapped in the generic command envelope.
//! - `FRS_READ_REQUEST` (0xF4) / `FRS_WRITE_REQUEST` (0xF7): likewise their
//!   own report types.
//! - Everything else rides the generic `COMMAND_REQUEST` (0xF2) envelope:
//!   report id, a per-session request sequence, a one-byte sub-command id,
//!   and up to nine parameter bytes — mirroring the `sh2_CommandParams`
//!   9-byte parameter block implied by `original_source/sh2.h`'s function
//!   signatures. The exact numeric sub-command ids are not present in the
//!   retrieved `original_source/` excerpt (only `sh2.h` survived, not
//!   `sh2.c`); this module assigns its own internally-consistent set in the
//!   order `sh2.h` declares the functions, documented here rather than
//!   presented as a literal reverse-engineering of the original.

use super::report::{Quaternion, SensorConfig, TareBasis};

pub(crate) const REPORT_ID_COMMAND_REQUEST: u8 = 0xF2;
pub(crate) const REPORT_ID_COMMAND_RESPONSE: u8 = 0xF1;
pub(crate) const REPORT_ID_GET_FEATURE_REQUEST: u8 = 0xFE;
pub(crate) const REPORT_ID_SET_FEATURE_COMMAND: u8 = 0xFD;
pub(crate) const REPORT_ID_GET_FEATURE_RESPONSE: u8 = 0xFC;
pub(crate) const REPORT_ID_FRS_READ_REQUEST: u8 = 0xF4;
pub(crate) const REPORT_ID_FRS_WRITE_REQUEST: u8 = 0xF7;
pub(crate) const REPORT_ID_FRS_WRITE_DATA: u8 = 0xF6;

const SUB_COUNTS: u8 = 1;
const SUB_TARE: u8 = 2;
const SUB_REORIENT: u8 = 3;
const SUB_INITIALIZE: u8 = 4;
const SUB_DCD: u8 = 5;
const SUB_ME_CAL: u8 = 6;
const SUB_IZRO: u8 = 7;
const SUB_WHEEL_ENCODER: u8 = 8;
const SUB_DEAD_RECKONING_CAL: u8 = 9;

const TARE_ACTION_SET_NOW: u8 = 0;
const TARE_ACTION_PERSIST: u8 = 1;
const TARE_ACTION_CLEAR: u8 = 2;

const DCD_ACTION_SAVE: u8 = 0;
const DCD_ACTION_CLEAR_AND_RESET: u8 = 1;

const ME_CAL_ACTION_START: u8 = 0;
const ME_CAL_ACTION_FINISH: u8 = 1;

const COUNTS_ACTION_GET: u8 = 0;
const COUNTS_ACTION_CLEAR: u8 = 1;

/// Maximum encoded frame length across every [`Command`] variant: the
/// 17-byte `SET_FEATURE_COMMAND` body is the largest.
pub const MAX_ENCODED_LEN: usize = 17;

/// The documented SH-2 commands this facade can serialize (spec §4.6).
///
/// `ClearTare` and `ClearDcdAndReset` intentionally take no parameter beyond
/// the session itself — `original_source/sh2.h` declares both with a
/// copy-pasted duplicate `handle` parameter, which spec.md §9 records as a
/// bug and directs implementers not to reproduce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command<'a> {
    GetFeature { sensor_id: u8 },
    SetFeature { sensor_id: u8, config: SensorConfig },
    GetFrs { record_id: u16 },
    SetFrs { record_id: u16, words: &'a [u32] },
    GetCounts { sensor_id: u8 },
    ClearCounts { sensor_id: u8 },
    TareNow { axes: u8, basis: TareBasis },
    PersistTare,
    ClearTare,
    SetReorientation { orientation: Quaternion },
    Reinitialize,
    SaveDcdNow,
    ClearDcdAndReset,
    StartCal { interval_us: u32 },
    FinishCal,
    SetIZro { intent: super::report::IZroMotionIntent },
    ReportWheelEncoder {
        wheel_index: u8,
        timestamp: u32,
        wheel_data: i16,
        data_type: u8,
    },
    SaveDeadReckoningCalNow,
}

fn encode_generic(out: &mut [u8; MAX_ENCODED_LEN], seq: u8, sub_command: u8, params: &[u8]) -> usize {
    out[0] = REPORT_ID_COMMAND_REQUEST;
    out[1] = seq;
    out[2] = sub_command;
    out[3..3 + params.len()].copy_from_slice(params);
    3 + params.len()
}

fn encode_quaternion_q14(q: &Quaternion) -> [u8; 8] {
    let scale = 1i32 << 14;
    let mut out = [0u8; 8];
    for (i, v) in [q.x, q.y, q.z, q.w].iter().enumerate() {
        let fixed = (*v * scale as f64).round() as i16;
        out[i * 2..i * 2 + 2].copy_from_slice(&fixed.to_le_bytes());
    }
    out
}

impl<'a> Command<'a> {
    /// Encodes this command into `out`, stamping `seq` as the request
    /// sequence where the wire format carries one. Returns the number of
    /// bytes written.
    ///
    /// `SetFrs`'s word count is not validated against the HAL's payload
    /// limit here; [`super::Session::send_command`] relies on
    /// [`crate::shtp::Session::send`]'s own oversize check.
    pub(crate) fn encode(&self, seq: u8, out: &mut [u8; MAX_ENCODED_LEN]) -> usize {
        match *self {
            Command::GetFeature { sensor_id } => {
                out[0] = REPORT_ID_GET_FEATURE_REQUEST;
                out[1] = sensor_id;
                2
            }
            Command::SetFeature { sensor_id, config } => {
                out[0] = REPORT_ID_SET_FEATURE_COMMAND;
                out[1] = sensor_id;
                let mut body = [0u8; 15];
                config.encode(&mut body);
                out[2..17].copy_from_slice(&body);
                17
            }
            Command::GetFrs { record_id } => {
                out[0] = REPORT_ID_FRS_READ_REQUEST;
                out[1] = 0;
                out[2..4].copy_from_slice(&record_id.to_le_bytes());
                out[4..6].copy_from_slice(&0u16.to_le_bytes());
                6
            }
            Command::SetFrs { record_id, words } => {
                out[0] = REPORT_ID_FRS_WRITE_REQUEST;
                out[1] = 0;
                out[2..4].copy_from_slice(&(words.len() as u16).to_le_bytes());
                out[4..6].copy_from_slice(&record_id.to_le_bytes());
                6
            }
            Command::GetCounts { sensor_id } => {
                encode_generic(out, seq, SUB_COUNTS, &[COUNTS_ACTION_GET, sensor_id])
            }
            Command::ClearCounts { sensor_id } => {
                encode_generic(out, seq, SUB_COUNTS, &[COUNTS_ACTION_CLEAR, sensor_id])
            }
            Command::TareNow { axes, basis } => {
                encode_generic(out, seq, SUB_TARE, &[TARE_ACTION_SET_NOW, axes, basis as u8])
            }
            Command::PersistTare => encode_generic(out, seq, SUB_TARE, &[TARE_ACTION_PERSIST]),
            Command::ClearTare => encode_generic(out, seq, SUB_TARE, &[TARE_ACTION_CLEAR]),
            Command::SetReorientation { orientation } => {
                let q = encode_quaternion_q14(&orientation);
                encode_generic(out, seq, SUB_REORIENT, &q)
            }
            Command::Reinitialize => encode_generic(out, seq, SUB_INITIALIZE, &[]),
            Command::SaveDcdNow => encode_generic(out, seq, SUB_DCD, &[DCD_ACTION_SAVE]),
            Command::ClearDcdAndReset => {
                encode_generic(out, seq, SUB_DCD, &[DCD_ACTION_CLEAR_AND_RESET])
            }
            Command::StartCal { interval_us } => {
                let mut params = [0u8; 5];
                params[0] = ME_CAL_ACTION_START;
                params[1..5].copy_from_slice(&interval_us.to_le_bytes());
                encode_generic(out, seq, SUB_ME_CAL, &params)
            }
            Command::FinishCal => encode_generic(out, seq, SUB_ME_CAL, &[ME_CAL_ACTION_FINISH]),
            Command::SetIZro { intent } => encode_generic(out, seq, SUB_IZRO, &[intent as u8]),
            Command::ReportWheelEncoder {
                wheel_index,
                timestamp,
                wheel_data,
                data_type,
            } => {
                let mut params = [0u8; 8];
                params[0] = wheel_index;
                params[1..5].copy_from_slice(&timestamp.to_le_bytes());
                params[5..7].copy_from_slice(&wheel_data.to_le_bytes());
                params[7] = data_type;
                encode_generic(out, seq, SUB_WHEEL_ENCODER, &params)
            }
            Command::SaveDeadReckoningCalNow => {
                encode_generic(out, seq, SUB_DEAD_RECKONING_CAL, &[])
            }
        }
    }

    /// `true` if this command's response arrives on the generic
    /// `COMMAND_RESPONSE` (0xF1) report rather than its own report type.
    pub(crate) fn expects_command_response(&self) -> bool {
        !matches!(
            self,
            Command::GetFeature { .. }
                | Command::SetFeature { .. }
                | Command::GetFrs { .. }
                | Command::SetFrs { .. }
        )
    }
}

#[cfg(test)]
mod command_test {
    use super::*;
    use crate::sh2::report::IZroMotionIntent;

    #[test]
    fn get_feature_encodes_as_its_own_report_not_the_generic_envelope() {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let n = Command::GetFeature { sensor_id: 0x05 }.encode(7, &mut buf);
        assert_eq!(&buf[..n], &[REPORT_ID_GET_FEATURE_REQUEST, 0x05]);
    }

    #[test]
    fn clear_tare_takes_no_extra_parameter() {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let n = Command::ClearTare.encode(3, &mut buf);
        assert_eq!(&buf[..n], &[REPORT_ID_COMMAND_REQUEST, 3, SUB_TARE, TARE_ACTION_CLEAR]);
    }

    #[test]
    fn set_izro_carries_the_requested_intent_byte() {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let n = Command::SetIZro {
            intent: IZroMotionIntent::InMotion,
        }
        .encode(1, &mut buf);
        assert_eq!(&buf[..n], &[REPORT_ID_COMMAND_REQUEST, 1, SUB_IZRO, 3]);
    }

    #[test]
    fn set_feature_body_round_trips_through_sensor_config_decode() {
        let config = SensorConfig {
            wakeup_enabled: true,
            report_interval_us: 10_000,
            ..Default::default()
        };
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let n = Command::SetFeature { sensor_id: 0x08, config }.encode(0, &mut buf);
        assert_eq!(n, 17);
        let mut body = [0u8; 15];
        body.copy_from_slice(&buf[2..17]);
        assert_eq!(SensorConfig::decode(&body), config);
    }
}
