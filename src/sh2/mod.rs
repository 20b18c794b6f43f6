//! Sensor-hub session facade: a thin marshalling shim over
//! [`crate::shtp::Session`] (spec §4.6).
//!
//! Registers listeners on the well-known channels, serializes the
//! documented SH-2 commands with a monotonically increasing request
//! sequence, and surfaces a sensor-event callback plus an async-event
//! callback. No data-structural novelty lives here — the hard part is the
//! transport underneath.

pub mod command;
pub mod report;

use crate::error::{Error, Result};
use crate::hal::Hal;
use crate::shtp;
use crate::shtp::ShtpEvent;

pub use command::Command;
pub use report::{
    AsyncEvent, AsyncEventCallback, IZroMotionIntent, Quaternion, SensorCallback, SensorConfig,
    SensorEvent, TareBasis, TARE_X, TARE_Y, TARE_Z,
};

const CHAN_EXECUTABLE: u8 = 1;
const CHAN_CONTROL: u8 = 2;
const CHAN_INPUT_REPORTS: u8 = 3;
const CHAN_WAKE_INPUT_REPORTS: u8 = 4;
const CHAN_GYRO_INTEGRATED_RV: u8 = 5;

const EXECUTABLE_DEVICE_CMD_RESET: u8 = 1;
const EXECUTABLE_DEVICE_CMD_ON: u8 = 2;
const EXECUTABLE_DEVICE_CMD_SLEEP: u8 = 3;
const EXECUTABLE_DEVICE_RESP_RESET_COMPLETE: u8 = 1;

/// A sensor-hub session: an [`shtp::Session`] plus the sh2-level listener
/// wiring and command bookkeeping spec §4.6 describes.
///
/// Returned from [`Session::open`] boxed, not by value: the facade
/// registers its own address as the cookie for every [`shtp::Session`]
/// listener it installs, so the session must not move after construction.
/// A `Box` gives that address stability for free — the box's content never
/// moves even if the `Box<Session<..>>` handle itself does.
pub struct Session<H: Hal, const TRANSFER_IN: usize, const TRANSFER_OUT: usize, const PAYLOAD_IN: usize> {
    shtp: shtp::Session<H, TRANSFER_IN, TRANSFER_OUT, PAYLOAD_IN>,
    sensor_cb: Option<(SensorCallback, *mut ())>,
    event_cb: Option<(AsyncEventCallback, *mut ())>,
    next_req_seq: u8,
    pending: Option<(u8, u8)>,
}

impl<H: Hal, const TRANSFER_IN: usize, const TRANSFER_OUT: usize, const PAYLOAD_IN: usize>
    Session<H, TRANSFER_IN, TRANSFER_OUT, PAYLOAD_IN>
{
    /// Opens `hal` and registers listeners on every well-known channel.
    pub fn open(hal: H) -> Result<Box<Self>, H::Error> {
        let mut session = Box::new(Session {
            shtp: shtp::Session::default(),
            sensor_cb: None,
            event_cb: None,
            next_req_seq: 0,
            pending: None,
        });
        session.shtp.open(hal).map_err(Error::Hal)?;
        session.bind_listeners();
        Ok(session)
    }

    fn bind_listeners(&mut self) {
        let cookie = self as *mut Self as *mut ();
        // Channel 0 (command) is reserved by SHTP itself; `listen` rejects
        // it, so this facade never registers on it directly.
        self.shtp
            .listen(CHAN_EXECUTABLE, Some((Self::on_executable, cookie)))
            .expect("channel 1 is in range");
        self.shtp
            .listen(CHAN_CONTROL, Some((Self::on_control, cookie)))
            .expect("channel 2 is in range");
        self.shtp
            .listen(CHAN_INPUT_REPORTS, Some((Self::on_sensor_report, cookie)))
            .expect("channel 3 is in range");
        self.shtp
            .listen(CHAN_WAKE_INPUT_REPORTS, Some((Self::on_sensor_report, cookie)))
            .expect("channel 4 is in range");
        self.shtp
            .listen(CHAN_GYRO_INTEGRATED_RV, Some((Self::on_sensor_report, cookie)))
            .expect("channel 5 is in range");
        self.shtp
            .set_event_callback(Some((Self::on_shtp_event, cookie)));
    }

    /// Closes the underlying HAL and SHTP session.
    pub fn close(&mut self) {
        self.shtp.close();
    }

    /// Registers (or clears) the callback invoked once per reassembled
    /// input report on channels 3, 4, or 5.
    pub fn set_sensor_callback(&mut self, callback: Option<(SensorCallback, *mut ())>) {
        self.sensor_cb = callback;
    }

    /// Registers (or clears) the callback invoked for [`AsyncEvent`]s.
    pub fn set_event_callback(&mut self, callback: Option<(AsyncEventCallback, *mut ())>) {
        self.event_cb = callback;
    }

    /// Pumps the underlying transport once; see
    /// [`shtp::Session::service`].
    pub fn service(&mut self) -> Result<(), H::Error> {
        self.shtp.service()
    }

    fn send_command(&mut self, command: Command<'_>) -> Result<(), H::Error> {
        let seq = self.next_req_seq;
        self.next_req_seq = self.next_req_seq.wrapping_add(1);
        let mut buf = [0u8; command::MAX_ENCODED_LEN];
        let n = command.encode(seq, &mut buf);
        if command.expects_command_response() {
            self.pending = Some((buf[2], seq));
        }
        self.shtp.send(CHAN_CONTROL, &buf[..n])
    }

    /// Resets the sensor hub (executable channel byte-command).
    pub fn dev_reset(&mut self) -> Result<(), H::Error> {
        self.shtp.send(CHAN_EXECUTABLE, &[EXECUTABLE_DEVICE_CMD_RESET])
    }

    /// Brings the sensor hub out of sleep (executable channel byte-command).
    pub fn dev_on(&mut self) -> Result<(), H::Error> {
        self.shtp.send(CHAN_EXECUTABLE, &[EXECUTABLE_DEVICE_CMD_ON])
    }

    /// Puts the sensor hub to sleep (executable channel byte-command).
    pub fn dev_sleep(&mut self) -> Result<(), H::Error> {
        self.shtp.send(CHAN_EXECUTABLE, &[EXECUTABLE_DEVICE_CMD_SLEEP])
    }

    /// Requests the current feature configuration of `sensor_id`. The
    /// response arrives as [`AsyncEvent::GetFeatureResp`].
    pub fn get_feature(&mut self, sensor_id: u8) -> Result<(), H::Error> {
        self.send_command(Command::GetFeature { sensor_id })
    }

    /// Sets the feature configuration of `sensor_id`.
    pub fn set_feature(&mut self, sensor_id: u8, config: SensorConfig) -> Result<(), H::Error> {
        self.send_command(Command::SetFeature { sensor_id, config })
    }

    /// Requests the contents of FRS record `record_id`.
    pub fn get_frs(&mut self, record_id: u16) -> Result<(), H::Error> {
        self.send_command(Command::GetFrs { record_id })
    }

    /// Writes `words` to FRS record `record_id`.
    pub fn set_frs(&mut self, record_id: u16, words: &[u32]) -> Result<(), H::Error> {
        self.send_command(Command::SetFrs { record_id, words })
    }

    /// Requests the event counts for `sensor_id`.
    pub fn get_counts(&mut self, sensor_id: u8) -> Result<(), H::Error> {
        self.send_command(Command::GetCounts { sensor_id })
    }

    /// Clears the event counts for `sensor_id`.
    pub fn clear_counts(&mut self, sensor_id: u8) -> Result<(), H::Error> {
        self.send_command(Command::ClearCounts { sensor_id })
    }

    /// Tares the fused rotation vector immediately, using `basis` and the
    /// `axes` bit field (see [`TARE_X`]/[`TARE_Y`]/[`TARE_Z`]).
    pub fn tare_now(&mut self, axes: u8, basis: TareBasis) -> Result<(), H::Error> {
        self.send_command(Command::TareNow { axes, basis })
    }

    /// Persists the current tare to flash.
    pub fn persist_tare(&mut self) -> Result<(), H::Error> {
        self.send_command(Command::PersistTare)
    }

    /// Clears the current tare.
    pub fn clear_tare(&mut self) -> Result<(), H::Error> {
        self.send_command(Command::ClearTare)
    }

    /// Sets the reorientation quaternion applied to the fused outputs.
    pub fn set_reorientation(&mut self, orientation: Quaternion) -> Result<(), H::Error> {
        self.send_command(Command::SetReorientation { orientation })
    }

    /// Reinitializes the sensor hub's motion engine.
    pub fn reinitialize(&mut self) -> Result<(), H::Error> {
        self.send_command(Command::Reinitialize)
    }

    /// Saves dynamic calibration data to flash now.
    pub fn save_dcd_now(&mut self) -> Result<(), H::Error> {
        self.send_command(Command::SaveDcdNow)
    }

    /// Clears dynamic calibration data and resets the sensor hub.
    pub fn clear_dcd_and_reset(&mut self) -> Result<(), H::Error> {
        self.send_command(Command::ClearDcdAndReset)
    }

    /// Starts ME calibration with the given sampling interval.
    pub fn start_cal(&mut self, interval_us: u32) -> Result<(), H::Error> {
        self.send_command(Command::StartCal { interval_us })
    }

    /// Finishes ME calibration.
    pub fn finish_cal(&mut self) -> Result<(), H::Error> {
        self.send_command(Command::FinishCal)
    }

    /// Sets the Interactive ZRO motion intent.
    pub fn set_izro(&mut self, intent: IZroMotionIntent) -> Result<(), H::Error> {
        self.send_command(Command::SetIZro { intent })
    }

    /// Reports one wheel encoder sample for dead-reckoning.
    pub fn report_wheel_encoder(
        &mut self,
        wheel_index: u8,
        timestamp: u32,
        wheel_data: i16,
        data_type: u8,
    ) -> Result<(), H::Error> {
        self.send_command(Command::ReportWheelEncoder {
            wheel_index,
            timestamp,
            wheel_data,
            data_type,
        })
    }

    /// Saves dead-reckoning calibration data now.
    pub fn save_dead_reckoning_cal_now(&mut self) -> Result<(), H::Error> {
        self.send_command(Command::SaveDeadReckoningCalNow)
    }

    fn on_executable(cookie: *mut (), payload: &[u8], _timestamp_us: u64) {
        let session = unsafe { &mut *(cookie as *mut Self) };
        if payload.first() == Some(&EXECUTABLE_DEVICE_RESP_RESET_COMPLETE) {
            session.emit(AsyncEvent::Reset);
        }
    }

    fn on_control(cookie: *mut (), payload: &[u8], _timestamp_us: u64) {
        let session = unsafe { &mut *(cookie as *mut Self) };
        match payload.first() {
            Some(&command::REPORT_ID_GET_FEATURE_RESPONSE) if payload.len() >= 17 => {
                let sensor_id = payload[1];
                let mut body = [0u8; 15];
                body.copy_from_slice(&payload[2..17]);
                session.emit(AsyncEvent::GetFeatureResp {
                    sensor_id,
                    config: SensorConfig::decode(&body),
                });
            }
            Some(&command::REPORT_ID_COMMAND_RESPONSE) if payload.len() >= 3 => {
                let sub_command = payload[1];
                let seq = payload[2];
                if session.pending == Some((sub_command, seq)) {
                    session.pending = None;
                } else {
                    log::debug!("sh2: unexpected command response ({sub_command}, {seq})");
                }
            }
            _ => log::trace!("sh2: ignoring control-channel report {:?}", payload.first()),
        }
    }

    fn on_sensor_report(cookie: *mut (), payload: &[u8], timestamp_us: u64) {
        let session = unsafe { &mut *(cookie as *mut Self) };
        if let Some(event) = SensorEvent::from_payload(payload, timestamp_us) {
            if let Some((cb, sensor_cookie)) = session.sensor_cb {
                cb(sensor_cookie, &event);
            }
        }
    }

    fn on_shtp_event(cookie: *mut (), event: ShtpEvent) {
        let session = unsafe { &mut *(cookie as *mut Self) };
        session.emit(AsyncEvent::ShtpEvent(event));
    }

    fn emit(&self, event: AsyncEvent) {
        if let Some((cb, cookie)) = self.event_cb {
            cb(cookie, &event);
        }
    }
}

#[cfg(test)]
mod sh2_test {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct LoopbackHal {
        sent: VecDeque<([u8; 64], usize)>,
        pending: VecDeque<([u8; 64], usize)>,
    }

    impl LoopbackHal {
        fn new() -> Self {
            LoopbackHal {
                sent: VecDeque::new(),
                pending: VecDeque::new(),
            }
        }

        fn push_inbound(&mut self, frame: &[u8]) {
            let mut buf = [0u8; 64];
            buf[..frame.len()].copy_from_slice(frame);
            self.pending.push_back((buf, frame.len()));
        }
    }

    impl crate::hal::HalLimits for LoopbackHal {
        const MAX_TRANSFER_IN: usize = 64;
        const MAX_TRANSFER_OUT: usize = 64;
        const MAX_PAYLOAD_IN: usize = 128;
        const MAX_PAYLOAD_OUT: usize = 128;
    }

    impl crate::hal::Hal for LoopbackHal {
        type Error = ();

        fn open(&mut self) -> core::result::Result<(), ()> {
            Ok(())
        }
        fn close(&mut self) {}

        fn write(&mut self, buf: &[u8], len: usize) -> core::result::Result<usize, ()> {
            let mut frame = [0u8; 64];
            frame[..len].copy_from_slice(&buf[..len]);
            self.sent.push_back((frame, len));
            Ok(len)
        }

        fn read(&mut self, buf: &mut [u8], _cap: usize) -> core::result::Result<(usize, u64), ()> {
            match self.pending.pop_front() {
                Some((frame, len)) => {
                    buf[..len].copy_from_slice(&frame[..len]);
                    Ok((len, 0))
                }
                None => Ok((0, 0)),
            }
        }
    }

    type TestSession = Session<LoopbackHal, 64, 64, 128>;

    static RESET_SEEN: Mutex<bool> = Mutex::new(false);

    fn on_event(_cookie: *mut (), event: &AsyncEvent) {
        if *event == AsyncEvent::Reset {
            *RESET_SEEN.lock().unwrap() = true;
        }
    }

    #[test]
    fn executable_reset_complete_synthesizes_one_reset_event() {
        let _ = env_logger::builder().is_test(true).try_init();
        *RESET_SEEN.lock().unwrap() = false;

        let mut hal = LoopbackHal::new();
        hal.push_inbound(&[0x05, 0x00, CHAN_EXECUTABLE, 0, EXECUTABLE_DEVICE_RESP_RESET_COMPLETE]);

        let mut session = TestSession::open(hal).unwrap();
        session.set_event_callback(Some((on_event, core::ptr::null_mut())));

        session.service().unwrap();

        assert!(*RESET_SEEN.lock().unwrap());
    }

    #[test]
    fn get_feature_request_is_two_bytes_on_control_channel() {
        let mut session = TestSession::open(LoopbackHal::new()).unwrap();
        session.get_feature(0x05).unwrap();

        let (frame, len) = session.shtp.hal_mut().unwrap().sent.pop_front().unwrap();
        assert_eq!(len, 6); // 4-byte SHTP header + 2-byte GET_FEATURE_REQUEST body
        assert_eq!(&frame[4..6], &[command::REPORT_ID_GET_FEATURE_REQUEST, 0x05]);
    }

    #[test]
    fn get_feature_response_surfaces_as_async_event() {
        static SEEN: Mutex<Option<(u8, bool)>> = Mutex::new(None);
        fn on_event(_cookie: *mut (), event: &AsyncEvent) {
            if let AsyncEvent::GetFeatureResp { sensor_id, config } = event {
                *SEEN.lock().unwrap() = Some((*sensor_id, config.wakeup_enabled));
            }
        }

        let mut body = [0u8; 17];
        body[0] = command::REPORT_ID_GET_FEATURE_RESPONSE;
        body[1] = 0x05; // sensor id
        body[2] = 0b0000_0100; // wakeup_enabled bit

        let mut hal = LoopbackHal::new();
        let mut frame = vec![0x00, 0x00, CHAN_CONTROL, 0];
        frame[0] = (frame.len() + body.len()) as u8;
        frame.extend_from_slice(&body);
        hal.push_inbound(&frame);

        let mut session = TestSession::open(hal).unwrap();
        session.set_event_callback(Some((on_event, core::ptr::null_mut())));
        session.service().unwrap();

        assert_eq!(*SEEN.lock().unwrap(), Some((0x05, true)));
    }
}
