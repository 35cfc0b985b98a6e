//! Integration tests for controller discovery and command dispatch.
//!
//! Hardware is replaced by the in-memory port bus. These tests verify:
//! - Identity order drives chunk routing regardless of port names
//! - Retry and not-found handling during discovery
//! - Dry run when nothing is connected
//! - Manual keys, broadcast reset and idempotent shutdown
//! - Connect backoff, settle and inter-write waits

use std::sync::Arc;
use std::time::{Duration, Instant};

use seatplan::codec::{encode, CellId, PlacementPlan};
use seatplan::device::memory::MemoryBus;
use seatplan::device::{
    ChunkResult, DeviceError, DeviceLinkManager, DispatchOutcome, EndpointStatus, IdentityTable,
    LinkTiming,
};

// =============================================================================
// Test Helpers
// =============================================================================

const SERIALS: [&str; 4] = ["AAA1", "BBB2", "CCC3", "DDD4"];

fn cell(n: u8) -> CellId {
    CellId::new(n).unwrap()
}

fn manager(bus: &MemoryBus) -> DeviceLinkManager {
    DeviceLinkManager::new(
        IdentityTable::new(&SERIALS).unwrap(),
        Arc::new(bus.clone()),
        LinkTiming::immediate(),
    )
}

// =============================================================================
// Discovery and routing
// =============================================================================

#[test]
fn chunks_follow_identity_order_not_port_order() {
    let bus = MemoryBus::new();
    // Enumerated in reverse so port order and cell order disagree
    bus.add_port("/dev/ttyACM0", SERIALS[3]);
    bus.add_port("/dev/ttyACM1", SERIALS[2]);
    bus.add_port("/dev/ttyACM2", SERIALS[1]);
    bus.add_port("/dev/ttyACM3", SERIALS[0]);
    let devices = manager(&bus);

    let report = devices.discover_and_connect();
    assert_eq!(report.live_count(), 4);

    let plan = PlacementPlan::from_json_str(
        r#"{"1": ["seat_rotate(180)"], "2": ["disk_rotate(90)"], "3": ["move_on_rail('A')"], "4": ["fold"]}"#,
    )
    .unwrap();
    let command = encode(&plan).unwrap();
    assert_eq!(command.as_str(), "2000001001000001");

    let outcome = devices.dispatch(&command);
    match outcome {
        DispatchOutcome::Sent(report) => assert_eq!(report.sent_count(), 4),
        other => panic!("expected a sent dispatch, got {other:?}"),
    }
    assert_eq!(bus.written("/dev/ttyACM3"), "2000\n");
    assert_eq!(bus.written("/dev/ttyACM2"), "0010\n");
    assert_eq!(bus.written("/dev/ttyACM1"), "0100\n");
    assert_eq!(bus.written("/dev/ttyACM0"), "0001\n");
}

#[test]
fn discovery_retries_and_reports_missing_cells() {
    let bus = MemoryBus::new();
    bus.add_port("/dev/ttyUSB0", SERIALS[0]);
    bus.add_port("/dev/ttyUSB1", SERIALS[1]);
    bus.fail_opens("/dev/ttyUSB1", 2);
    let devices = manager(&bus);

    let report = devices.discover_and_connect();

    assert_eq!(report.live_count(), 2);
    assert_eq!(bus.open_attempts("/dev/ttyUSB1"), 3);
    assert_eq!(report.status(cell(3)), Some(&EndpointStatus::NotFound));
    assert_eq!(report.status(cell(4)), Some(&EndpointStatus::NotFound));

    let command = "1000200030004000".parse().unwrap();
    match devices.dispatch(&command) {
        DispatchOutcome::Sent(report) => {
            assert_eq!(report.sent_count(), 2);
            assert_eq!(report.result(cell(3)), Some(&ChunkResult::Skipped));
        }
        other => panic!("expected a sent dispatch, got {other:?}"),
    }
}

#[test]
fn nothing_connected_is_a_dry_run() {
    let bus = MemoryBus::new();
    let devices = manager(&bus);

    assert_eq!(devices.discover_and_connect().live_count(), 0);
    let outcome = devices.dispatch(&"0000000000000000".parse().unwrap());
    assert!(outcome.is_dry_run());
}

// =============================================================================
// Manual control and teardown
// =============================================================================

#[test]
fn manual_keys_reset_and_shutdown() {
    let bus = MemoryBus::new();
    bus.add_port("/dev/ttyACM0", SERIALS[0]);
    bus.add_port("/dev/ttyACM1", SERIALS[1]);
    let devices = manager(&bus);
    devices.discover_and_connect();

    assert_eq!(devices.send_to_cell(cell(2), "w").unwrap(), 'W');
    assert!(matches!(
        devices.send_to_cell(cell(2), "x"),
        Err(DeviceError::InvalidCommand(_))
    ));
    assert!(matches!(
        devices.send_to_cell(cell(4), "Q"),
        Err(DeviceError::NotConnected(_))
    ));

    assert!(!devices.reset().is_dry_run());
    assert_eq!(bus.written("/dev/ttyACM0"), "P\n");
    assert_eq!(bus.written("/dev/ttyACM1"), "W\nP\n");

    assert_eq!(devices.shutdown(), 2);
    assert_eq!(devices.shutdown(), 0);
    assert!(!bus.is_open("/dev/ttyACM0"));
    assert!(devices.dispatch(&"0000000000000000".parse().unwrap()).is_dry_run());
}

// =============================================================================
// Timing
// =============================================================================

#[test]
fn connect_and_dispatch_honour_configured_waits() {
    let bus = MemoryBus::new();
    for (n, serial) in SERIALS.iter().enumerate() {
        bus.add_port(&format!("/dev/ttyACM{n}"), serial);
    }
    bus.fail_opens("/dev/ttyACM1", 2);
    let devices = DeviceLinkManager::new(
        IdentityTable::new(&SERIALS).unwrap(),
        Arc::new(bus.clone()),
        LinkTiming {
            connect_retries: 3,
            retry_backoff: Duration::from_millis(10),
            settle: Duration::from_millis(5),
            inter_write: Duration::from_millis(10),
            ..LinkTiming::immediate()
        },
    );

    let start = Instant::now();
    let report = devices.discover_and_connect();
    let connect_elapsed = start.elapsed();
    assert_eq!(report.live_count(), 4);
    assert_eq!(bus.open_attempts("/dev/ttyACM1"), 3);
    // Backoff of 10ms then 20ms, plus one settle
    assert!(
        connect_elapsed >= Duration::from_millis(35),
        "connect took {connect_elapsed:?}"
    );

    let start = Instant::now();
    let outcome = devices.dispatch(&"1000200030004000".parse().unwrap());
    let dispatch_elapsed = start.elapsed();
    assert!(!outcome.is_dry_run());
    // One wait between each pair of consecutive writes
    assert!(
        dispatch_elapsed >= Duration::from_millis(30),
        "dispatch took {dispatch_elapsed:?}"
    );
    assert_eq!(bus.written("/dev/ttyACM3"), "4000\n");
}
