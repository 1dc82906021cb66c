use proptest::prelude::*;
use routerkit_communication::{parse_status_frame, StatusUpdate};
use routerkit_core::MachineStatus;

#[test]
fn test_parse_idle_report() {
    let update = parse_status_frame("<Idle|MPos:0.000,0.000,0.000|FS:0,0>").unwrap();
    assert_eq!(update.status, Some(MachineStatus::Idle));
    assert_eq!(update.machine_pos.unwrap().x, 0.0);
}

#[test]
fn test_parse_hold_with_substate() {
    let update = parse_status_frame("<Hold:1|MPos:4.000,0.000,1.000>").unwrap();
    assert_eq!(update.status, Some(MachineStatus::Paused));
}

#[test]
fn test_fields_arrive_in_any_order() {
    let a = parse_status_frame("<Run|MPos:1,2,3|WCO:0.5,0,0|FS:100,8000>").unwrap();
    let b = parse_status_frame("<Run|FS:100,8000|WCO:0.5,0,0|MPos:1,2,3>").unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_sparse_frame_leaves_absent_fields_none() {
    let update = parse_status_frame("<Alarm>").unwrap();
    assert_eq!(
        update,
        StatusUpdate {
            status: Some(MachineStatus::Alarm),
            ..Default::default()
        }
    );
}

proptest! {
    /// Any frame we can render round-trips its coordinates exactly.
    #[test]
    fn generated_frames_round_trip(
        x in -1000.0f64..1000.0,
        y in -1000.0f64..1000.0,
        z in -1000.0f64..1000.0,
        feed in 0.0f64..5000.0,
        rpm in 0.0f64..24000.0,
    ) {
        let frame = format!("<Run|MPos:{:.3},{:.3},{:.3}|FS:{:.1},{:.1}>", x, y, z, feed, rpm);
        let update = parse_status_frame(&frame).unwrap();
        let pos = update.machine_pos.unwrap();
        prop_assert!((pos.x - x).abs() < 1e-3);
        prop_assert!((pos.y - y).abs() < 1e-3);
        prop_assert!((pos.z - z).abs() < 1e-3);
        prop_assert!((update.feed_rate.unwrap() - feed).abs() < 0.1);
        prop_assert!((update.spindle_rpm.unwrap() - rpm).abs() < 0.1);
    }

    /// Arbitrary garbage never panics and non-frames never parse.
    #[test]
    fn garbage_lines_never_panic(line in "\\PC{0,40}") {
        let parsed = parse_status_frame(&line);
        if !line.trim_start().starts_with('<') {
            prop_assert!(parsed.is_none());
        }
    }
}
