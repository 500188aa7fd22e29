use proptest::prelude::*;

use crane_sim::kinematics::{
    BOOM_ANGLE_MAX, BOOM_ANGLE_MIN, CABLE_LENGTH_MAX, CABLE_LENGTH_MIN, TROLLEY_OFFSET_MAX,
    TROLLEY_OFFSET_MIN,
};
use crane_sim::{
    ControlKey, DisplaySnapshot, ForwardKinematics, InputSnapshot, KinematicState, RigGeometry,
};

fn key_set() -> impl Strategy<Value = Vec<ControlKey>> {
    proptest::sample::subsequence(ControlKey::ALL.to_vec(), 0..=ControlKey::ALL.len())
}

fn state_in_range() -> impl Strategy<Value = KinematicState> {
    (
        BOOM_ANGLE_MIN..=BOOM_ANGLE_MAX,
        CABLE_LENGTH_MIN..=CABLE_LENGTH_MAX,
        -50.0f64..50.0,
        TROLLEY_OFFSET_MIN..=TROLLEY_OFFSET_MAX,
    )
        .prop_map(|(boom, cable, rotation, trolley)| {
            KinematicState::new(boom, cable, rotation, trolley)
        })
}

proptest! {
    #[test]
    fn advance_never_leaves_the_valid_range(
        start in state_in_range(),
        steps in proptest::collection::vec(key_set(), 1..300),
    ) {
        let mut state = start;
        for keys in &steps {
            state = state.advance(&InputSnapshot::with_controls(keys));
            prop_assert!(state.in_range(), "{state:?} after {keys:?}");
        }
    }

    #[test]
    fn no_keys_means_no_change(start in state_in_range()) {
        prop_assert_eq!(start.advance(&InputSnapshot::default()), start);
    }

    #[test]
    fn hook_hangs_straight_below_the_trolley(state in state_in_range()) {
        let poses = ForwardKinematics::new(RigGeometry::default()).compute_poses(&state);
        let trolley = poses.trolley.position;
        let hook = poses.hook.position;
        prop_assert!((hook.x - trolley.x).abs() < 1e-9);
        prop_assert!((hook.z - trolley.z).abs() < 1e-9);
        prop_assert!((trolley.y - hook.y - state.cable_length).abs() < 1e-9);
        prop_assert_eq!(poses.hook.rotation, glam::DQuat::IDENTITY);
        prop_assert_eq!(poses.cable.rotation, glam::DQuat::IDENTITY);
    }

    #[test]
    fn snapshot_fields_stay_in_display_range(state in state_in_range()) {
        let snapshot = DisplaySnapshot::from_state(&state);
        prop_assert!(snapshot.boom_percent <= 100);
        prop_assert!(snapshot.rotation_degrees > -360 && snapshot.rotation_degrees <= 360);
        prop_assert!(snapshot.cable_length >= CABLE_LENGTH_MIN);
        prop_assert!(snapshot.cable_length <= CABLE_LENGTH_MAX);
    }
}
