//! End-to-end scenarios over the mock line subsystem: motor motion
//! outcomes, coop status transitions, configuration updates, and the
//! service facade.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};

use coopd::config::{ConditionConfig, Config, CoopConfig};
use coopd::coop::door::Door;
use coopd::coop::{Coop, CoopEvent, CoopStatus, CoopUpdateRequest};
use coopd::drivers::motor::{DutyCycles, LimitSwitches, Motor, MotorPins};
use coopd::error::{ConditionError, CoopError, Error, LineError, MotorError};
use coopd::ports::{CancelToken, GpioBus, Level, NullSink};
use coopd::service::CoopService;

use crate::mock_gpio::{MockGpio, RecordingSink};

const IN1: u8 = 20;
const IN2: u8 = 21;
const ENABLE: u8 = 12;
const OPEN_LIMIT: u8 = 5;
const CLOSE_LIMIT: u8 = 6;

fn motor(mock: &MockGpio) -> Motor<MockGpio> {
    Motor::new(
        GpioBus::new(mock.clone()),
        MotorPins::L298n {
            in1: IN1,
            in2: IN2,
            enable: ENABLE,
        },
        LimitSwitches {
            open_pin: OPEN_LIMIT,
            close_pin: CLOSE_LIMIT,
        },
        DutyCycles {
            opening: 90,
            closing: 70,
        },
    )
}

fn door(mock: &MockGpio) -> Door<MockGpio> {
    // Short safety bounds keep the failure scenarios fast.
    Door::new(
        motor(mock),
        Duration::from_millis(300),
        Duration::from_millis(300),
    )
}

fn condition(mode: &str, value: &str) -> ConditionConfig {
    ConditionConfig {
        mode: mode.into(),
        value: value.into(),
    }
}

fn coop_config(is_automatic: bool) -> CoopConfig {
    CoopConfig {
        latitude: 0.0,
        longitude: 0.0,
        is_automatic,
        opening: condition("time_based", "08:00"),
        closing: condition("time_based", "20:00"),
    }
}

fn update_request(status: CoopStatus) -> CoopUpdateRequest {
    CoopUpdateRequest {
        status,
        is_automatic: false,
        latitude: 0.0,
        longitude: 0.0,
        opening_condition: condition("time_based", "08:00"),
        closing_condition: condition("time_based", "20:00"),
    }
}

// ── Motor ─────────────────────────────────────────────────────

#[test]
fn motor_stops_when_the_limit_switch_asserts() {
    let mock = MockGpio::new();
    mock.set_level(OPEN_LIMIT, Level::Low);

    let result = motor(&mock).forward(Instant::now() + Duration::from_secs(1), &CancelToken::new());

    assert_eq!(result, Ok(()));
    let history = mock.duty_history(ENABLE);
    assert!(history.contains(&90), "motion never reached full duty");
    assert_eq!(history.last(), Some(&0), "motor left powered");
}

#[test]
fn motor_times_out_past_the_deadline() {
    let mock = MockGpio::new();
    // Limit never asserts; the deadline is already in the past.
    let result = motor(&mock).forward(Instant::now(), &CancelToken::new());

    assert_eq!(result, Err(MotorError::Timeout));
    assert_eq!(mock.duty(ENABLE), Some((0, 100)));
}

#[test]
fn cancellation_wins_over_a_hit_limit_switch() {
    let mock = MockGpio::new();
    mock.set_level(OPEN_LIMIT, Level::Low);
    let cancel = CancelToken::new();
    cancel.cancel();

    let result = motor(&mock).forward(Instant::now() + Duration::from_secs(1), &cancel);

    assert_eq!(result, Err(MotorError::Cancelled));
    assert_eq!(mock.duty(ENABLE), Some((0, 100)));
}

#[test]
fn line_failure_mid_motion_halts_the_motor() {
    let mock = MockGpio::new();
    mock.fail_reads(OPEN_LIMIT);

    let result = motor(&mock).forward(Instant::now() + Duration::from_secs(1), &CancelToken::new());

    assert_eq!(result, Err(MotorError::LineAccess(LineError::ReadFailed)));
    assert_eq!(mock.duty(ENABLE), Some((0, 100)));
}

#[test]
fn backward_uses_the_closing_duty_and_close_limit() {
    let mock = MockGpio::new();
    mock.set_level(CLOSE_LIMIT, Level::Low);

    let result =
        motor(&mock).backward(Instant::now() + Duration::from_secs(1), &CancelToken::new());

    assert_eq!(result, Ok(()));
    assert!(mock.duty_history(ENABLE).contains(&70));
    assert_eq!(mock.written_level(IN1), Some(Level::Low));
    assert_eq!(mock.written_level(IN2), Some(Level::High));
}

#[test]
fn stop_drops_the_duty_unconditionally() {
    let mock = MockGpio::new();
    let m = motor(&mock);
    assert_eq!(m.stop(), Ok(()));
    assert_eq!(mock.duty(ENABLE), Some((0, 100)));
}

// ── Coop ──────────────────────────────────────────────────────

#[test]
fn coop_opens_from_closed_and_notifies() {
    let mock = MockGpio::new();
    mock.set_level(OPEN_LIMIT, Level::Low);
    let sink = RecordingSink::new();
    let coop = Coop::new(door(&mock), &coop_config(false), Arc::new(sink.clone())).unwrap();
    coop.update(&update_request(CoopStatus::Closed)).unwrap();

    coop.open().unwrap();

    assert_eq!(coop.snapshot().status, CoopStatus::Opened);
    assert_eq!(
        sink.events(),
        vec![
            CoopEvent::Started {
                status: CoopStatus::Unknown
            },
            CoopEvent::Opened,
        ]
    );
}

#[test]
fn opening_an_opened_coop_is_rejected_without_touching_lines() {
    let mock = MockGpio::new();
    let coop = Coop::new(door(&mock), &coop_config(false), Arc::new(NullSink)).unwrap();
    coop.update(&update_request(CoopStatus::Opened)).unwrap();
    let calls_before = mock.calls().len();

    assert_eq!(coop.open(), Err(Error::Coop(CoopError::AlreadyOpened)));
    assert_eq!(coop.snapshot().status, CoopStatus::Opened);
    assert_eq!(mock.calls().len(), calls_before);
}

#[test]
fn closing_a_closed_coop_is_rejected() {
    let mock = MockGpio::new();
    let coop = Coop::new(door(&mock), &coop_config(false), Arc::new(NullSink)).unwrap();
    coop.update(&update_request(CoopStatus::Closed)).unwrap();

    assert_eq!(coop.close(), Err(Error::Coop(CoopError::AlreadyClosed)));
}

#[test]
fn failed_motion_leaves_the_status_for_the_operator() {
    let mock = MockGpio::new();
    // Limit never asserts: the 300 ms safety bound trips.
    let coop = Coop::new(door(&mock), &coop_config(false), Arc::new(NullSink)).unwrap();
    coop.update(&update_request(CoopStatus::Closed)).unwrap();

    assert_eq!(coop.open(), Err(Error::Motor(MotorError::Timeout)));
    assert_eq!(coop.snapshot().status, CoopStatus::Opening);
    assert_eq!(mock.duty(ENABLE), Some((0, 100)));
}

#[test]
fn update_with_a_bad_condition_changes_nothing() {
    let mock = MockGpio::new();
    let coop = Coop::new(door(&mock), &coop_config(true), Arc::new(NullSink)).unwrap();

    let mut request = update_request(CoopStatus::Closed);
    request.opening_condition = condition("moon_based", "08:00");

    assert_eq!(
        coop.update(&request),
        Err(Error::Condition(ConditionError::UnknownMode))
    );
    let snapshot = coop.snapshot();
    assert_eq!(snapshot.status, CoopStatus::Unknown);
    assert!(snapshot.is_automatic);
    assert_eq!(snapshot.opening_condition.value, "08:00");
}

#[test]
fn stop_cuts_motor_power() {
    let mock = MockGpio::new();
    let coop = Coop::new(door(&mock), &coop_config(false), Arc::new(NullSink)).unwrap();

    coop.stop().unwrap();
    assert_eq!(mock.duty(ENABLE), Some((0, 100)));
}

// ── Automatic evaluation ──────────────────────────────────────

#[test]
fn evaluation_opens_a_closed_coop_between_the_triggers() {
    let mock = MockGpio::new();
    mock.set_level(OPEN_LIMIT, Level::Low);
    let coop = Coop::new(door(&mock), &coop_config(true), Arc::new(NullSink)).unwrap();
    let mut request = update_request(CoopStatus::Closed);
    request.is_automatic = true;
    coop.update(&request).unwrap();

    let noon = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
    coop.evaluate(&noon).unwrap();

    assert_eq!(coop.snapshot().status, CoopStatus::Opened);
}

#[test]
fn evaluation_closes_an_opened_coop_after_the_closing_trigger() {
    let mock = MockGpio::new();
    mock.set_level(CLOSE_LIMIT, Level::Low);
    let coop = Coop::new(door(&mock), &coop_config(true), Arc::new(NullSink)).unwrap();
    let mut request = update_request(CoopStatus::Opened);
    request.is_automatic = true;
    coop.update(&request).unwrap();

    let night = Utc.with_ymd_and_hms(2023, 6, 1, 22, 0, 0).unwrap();
    coop.evaluate(&night).unwrap();

    assert_eq!(coop.snapshot().status, CoopStatus::Closed);
}

#[test]
fn evaluation_never_moves_an_unknown_coop() {
    let mock = MockGpio::new();
    mock.set_level(OPEN_LIMIT, Level::Low);
    let coop = Coop::new(door(&mock), &coop_config(true), Arc::new(NullSink)).unwrap();

    let noon = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
    coop.evaluate(&noon).unwrap();

    assert_eq!(coop.snapshot().status, CoopStatus::Unknown);
    assert!(mock.duty_history(ENABLE).is_empty());
}

#[test]
fn evaluation_is_a_no_op_in_manual_mode() {
    let mock = MockGpio::new();
    mock.set_level(OPEN_LIMIT, Level::Low);
    let coop = Coop::new(door(&mock), &coop_config(false), Arc::new(NullSink)).unwrap();
    coop.update(&update_request(CoopStatus::Closed)).unwrap();

    let noon = Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap();
    coop.evaluate(&noon).unwrap();

    assert_eq!(coop.snapshot().status, CoopStatus::Closed);
}

#[test]
fn next_opening_time_reflects_the_configured_condition() {
    let mock = MockGpio::new();
    let coop = Coop::new(door(&mock), &coop_config(true), Arc::new(NullSink)).unwrap();

    let dawn = Utc.with_ymd_and_hms(2023, 6, 1, 4, 0, 0).unwrap();
    let next = coop.next_opening_time(&dawn).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2023, 6, 1, 8, 0, 0).unwrap());
}

// ── Service ───────────────────────────────────────────────────

#[test]
fn service_wires_up_from_the_default_config() {
    let mock = MockGpio::new();
    let config = Config::default();
    let service = CoopService::from_config(&config, mock.clone(), Arc::new(NullSink)).unwrap();

    // The fan line was initialised low during assembly.
    assert_eq!(mock.written_level(config.fan.pin), Some(Level::Low));
    assert_eq!(service.coop().status, CoopStatus::Unknown);
}

#[test]
fn service_rejects_an_invalid_config() {
    let mut config = Config::default();
    config.door.pwm_open_duty_cycle = 0;

    let result = CoopService::from_config(&config, MockGpio::new(), Arc::new(NullSink));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn fan_switches_on_the_temperature_threshold() {
    let mock = MockGpio::new();
    let mut config = Config::default();
    config.fan.temp_limit = 90.0;
    let service = CoopService::from_config(&config, mock.clone(), Arc::new(NullSink)).unwrap();

    service.drive_fan(95.0).unwrap();
    assert_eq!(mock.written_level(config.fan.pin), Some(Level::High));

    // At the limit exactly the fan stays off.
    service.drive_fan(90.0).unwrap();
    assert_eq!(mock.written_level(config.fan.pin), Some(Level::Low));

    service.drive_fan(42.0).unwrap();
    assert_eq!(mock.written_level(config.fan.pin), Some(Level::Low));
}
