use std::sync::Arc;

use once_cell::sync::Lazy;

use crane_sim::{
    ControlLoop, CranePart, ForwardKinematics, InputScript, InputState, Rig, SceneGraph,
};

static RIG: Lazy<Rig> = Lazy::new(Rig::default);

fn running_loop() -> (ControlLoop<SceneGraph>, SceneGraph) {
    let graph = SceneGraph::from_rig(&RIG);
    let mut control = ControlLoop::new(ForwardKinematics::new(RIG.geometry));
    control.start(graph.clone()).expect("default rig mounts");
    (control, graph)
}

#[test]
fn holding_a_for_fifty_ticks_slews_one_radian() {
    let (mut control, graph) = running_loop();

    control.handle_key("a", true);
    for _ in 0..50 {
        control.tick().unwrap();
    }
    control.handle_key("a", false);
    control.stop();

    assert!((control.state().rotation - 1.0).abs() < 1e-9);
    assert_eq!(control.latest_snapshot().rotation_degrees, 57);
    assert_eq!(graph.frames_rendered(), 50);

    let platform = graph.pose(CranePart::Platform).unwrap();
    let expected = ForwardKinematics::new(RIG.geometry).compute_poses(control.state());
    assert_eq!(platform, expected.platform);
}

#[test]
fn stopped_loop_drops_keys_and_leaves_poses_alone() {
    let (mut control, graph) = running_loop();
    control.handle_key("w", true);
    control.tick().unwrap();
    control.stop();

    let before = graph.all_nodes();
    let state = *control.state();

    assert!(!control.handle_key("q", true));
    assert!(!control.input().is_held("q"));
    assert!(!control.input().is_held("w"));
    assert!(control.tick().unwrap().is_none());

    assert_eq!(graph.all_nodes(), before);
    assert_eq!(*control.state(), state);
    assert_eq!(control.tick_count(), 1);
}

#[test]
fn state_survives_a_restart() {
    let (mut control, _) = running_loop();
    control.handle_key("s", true);
    for _ in 0..10 {
        control.tick().unwrap();
    }
    let graph = control.stop().unwrap();

    control.start(graph).unwrap();
    control.handle_key("s", true);
    control.tick().unwrap();
    assert!((control.state().cable_length - 6.1).abs() < 1e-9);
    assert_eq!(control.latest_snapshot().cable_length, 6.1);
}

#[test]
fn shared_input_state_feeds_the_loop() {
    let input = Arc::new(InputState::new());
    let mut control =
        ControlLoop::with_input(ForwardKinematics::new(RIG.geometry), Arc::clone(&input));
    control.start(SceneGraph::from_rig(&RIG)).unwrap();

    input.set_key_down("ArrowRight");
    control.tick().unwrap();
    input.set_key_up("arrowright");
    control.tick().unwrap();

    assert!((control.state().trolley_offset - 0.1).abs() < 1e-12);
}

#[test]
fn scripted_run_keeps_the_hook_under_the_trolley() {
    let (mut control, graph) = running_loop();
    let script = InputScript::parse(
        "down q\ndown d\ndown arrowright\ntick 40\nrelease\ndown s\ntick 30\nprint\n",
    )
    .unwrap();
    let printed = script.run(&mut control).unwrap();
    assert_eq!(printed.len(), 1);

    let trolley = graph.pose(CranePart::Trolley).unwrap().position;
    let hook = graph.pose(CranePart::Hook).unwrap().position;
    assert!((hook.x - trolley.x).abs() < 1e-9);
    assert!((hook.z - trolley.z).abs() < 1e-9);
    assert!((trolley.y - hook.y - control.state().cable_length).abs() < 1e-9);
}
