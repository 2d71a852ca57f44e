mod common;
use common::*;

use uvr_bridge::uvr::{negotiate_mode, Mode, Session};
use uvr_bridge::{DecodeError, Error};

fn handshake(mode: u8, reply: Vec<u8>) -> MockChannel {
    let mut input = vec![mode];
    input.extend(reply);
    MockChannel::new(input)
}

#[test]
fn negotiates_known_modes() {
    for (byte, mode) in [
        (0xA8, Mode::SingleFrame),
        (0xD1, Mode::DualFrame),
        (0xDC, Mode::Bus),
    ] {
        let mut channel = MockChannel::new(vec![byte]);

        assert_eq!(negotiate_mode(&mut channel).unwrap(), mode);
        assert_eq!(channel.written, vec![0x81]);
    }
}

#[test]
fn unknown_mode_byte() {
    let mut channel = MockChannel::new(vec![0x00]);

    assert!(matches!(
        negotiate_mode(&mut channel),
        Err(Error::UnknownMode(0x00))
    ));
}

#[test]
fn silent_logger_is_io_error() {
    let mut channel = MockChannel::new(Vec::new());

    assert!(matches!(negotiate_mode(&mut channel), Err(Error::Io(_))));
}

#[test]
fn polls_single_frame_logger() {
    let channel = handshake(0xA8, Factory::single_reply());
    let mut session = Session::negotiate(channel).unwrap();

    assert_eq!(session.mode(), Mode::SingleFrame);

    let readings = session.poll().unwrap();
    assert_eq!(readings.sensors.len(), 16);
    assert_eq!(readings.sensors[0].value, 53.4);
    assert_eq!(readings.heat.len(), 1);

    assert_eq!(session.into_inner().written, vec![0x81, 0xAB]);
}

#[test]
fn polls_dual_frame_logger_repeatedly() {
    let mut reply = Factory::dual_reply();
    reply.extend(Factory::dual_reply());
    let mut session = Session::negotiate(handshake(0xD1, reply)).unwrap();

    let first = session.poll().unwrap();
    let second = session.poll().unwrap();

    assert_eq!(first.sensors.len(), 32);
    assert_eq!(first, second);
}

#[test]
fn bus_session_cannot_poll() {
    let mut session = Session::negotiate(handshake(0xDC, Vec::new())).unwrap();

    assert!(matches!(session.poll(), Err(Error::UnsupportedMode)));
    assert_eq!(session.into_inner().written, vec![0x81]);
}

#[test]
fn uvr61_3_poll_reports_decode_error() {
    let reply = Factory::reply(&[(0x90, Factory::uvr61_3_payload())]);
    let mut session = Session::negotiate(handshake(0xA8, reply)).unwrap();

    let err = session.poll().unwrap_err();

    assert!(matches!(
        err,
        Error::Decode(DecodeError::FieldOutOfRange { field: "rates", .. })
    ));
    assert!(!err.needs_reconnect());
}
