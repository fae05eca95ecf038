//! End-to-end runs: program in, ticks forward, history and success out.

use std::cell::RefCell;
use std::rc::Rc;

use runtime::challenge::Challenge;
use runtime::program::{Expr, HatScript, Program, Stmt, Trigger};
use runtime::session::Session;
use runtime::VariableSink;

/// Sink that records every variable update in order.
#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<(String, f64)>>>);

impl VariableSink for Recorder {
    fn variable_changed(&mut self, name: &str, value: f64) {
        self.0.borrow_mut().push((name.to_string(), value));
    }
}

fn set(name: &str, value: f64) -> Stmt {
    Stmt::SetVariable(name.to_string(), Expr::Num(value))
}

#[test]
fn test_move_distance_is_monotone_then_stops() {
    let mut session = Session::new();
    session.start(&Program::single(vec![Stmt::Move(Expr::Num(100.0))]));

    let mut last = 0.0;
    let mut settled_at = None;
    for tick in 0..600 {
        session.tick();
        let d = session.history().max_distance_moved;
        assert!(d >= last, "history regressed at tick {tick}: {last} -> {d}");
        if settled_at.is_none() && session.robot().motor_left == 0.0 && d >= 100.0 {
            settled_at = Some((tick, session.robot().z));
        }
        last = d;
    }

    let (_, z_at_stop) = settled_at.expect("move(100) never reached its target");
    // Motors are off and the pose no longer changes.
    assert_eq!(session.robot().motor_left, 0.0);
    assert_eq!(session.robot().motor_right, 0.0);
    assert!((session.robot().z - z_at_stop).abs() < 1e-9);
    // 100 cm target with a small overshoot from the final control step.
    assert!(last >= 100.0 && last < 103.0, "distance was {last}");
}

#[test]
fn test_full_rotation_challenge_c2() {
    let challenge = Challenge::from_json(
        r##"{
            "id": "c2",
            "title": "Turn in Place",
            "difficulty": "Easy",
            "check": {"kind": "fullRotation", "degrees": 350.0}
        }"##,
    )
    .unwrap();

    // A full revolution satisfies the check.
    let mut session = Session::new();
    session.set_challenge(Some(challenge.clone()));
    session.start(&Program::single(vec![Stmt::Turn(Expr::Num(360.0))]));
    session.run_for(600);
    assert!(
        session.history().total_rotation.abs() >= 350.0,
        "rotated {}",
        session.history().total_rotation
    );
    assert!(session.success());

    // Half a revolution does not.
    let mut session = Session::new();
    session.set_challenge(Some(challenge));
    session.start(&Program::single(vec![Stmt::Turn(Expr::Num(180.0))]));
    session.run_for(600);
    assert!(!session.success());
}

#[test]
fn test_wall_approach_touches_and_stops() {
    // The obstacle-retreat arena: wall at z=-10, robot driving from the
    // origin facing -z. The bumper must hard-stop the chassis with the
    // reported distance at exactly 0.
    let challenge = Challenge::from_json(
        r##"{
            "id": "wall_run",
            "title": "Hit the wall",
            "difficulty": "Medium",
            "check": {"kind": "touchedWall"},
            "environmentObjects": [
                {"id": "w_hit", "type": "WALL", "x": 0, "z": -10, "width": 6, "length": 0.5, "color": "#FF0000"}
            ]
        }"##,
    )
    .unwrap();

    let mut session = Session::new();
    session.set_challenge(Some(challenge));
    session.start(&Program::single(vec![Stmt::Move(Expr::Num(200.0))]));
    session.run_for(400);

    assert!(session.history().touched_wall);
    assert!(session.success());
    // Stopped at the hard-stop distance from the wall face, not inside it.
    let z = session.robot().z;
    assert!(z <= -8.2 && z > -8.5, "stopped at z={z}");
    assert_eq!(session.robot().motor_left, 0.0);
}

#[test]
fn test_reset_leaves_no_stale_listeners() {
    let recorder = Recorder::default();
    let record = recorder.clone();
    let mut session = Session::new().with_sink(Box::new(recorder));

    // First run: a color listener that would fire on green, and a long move.
    let program = Program {
        scripts: vec![
            HatScript {
                trigger: Trigger::Start,
                body: vec![Stmt::Move(Expr::Num(1000.0))],
            },
            HatScript {
                trigger: Trigger::Color("green".to_string()),
                body: vec![set("stale", 1.0)],
            },
        ],
    };
    session.start(&program);
    session.run_for(30);
    session.reset();

    // Second run with no listeners drives over a green line; the old
    // listener must not fire.
    session.add_object(simcore::CustomObject {
        id: "l_green".to_string(),
        kind: simcore::ObjectKind::ColorLine,
        shape: None,
        x: 0.0,
        z: -3.0,
        rotation: 0.0,
        width: 2.5,
        length: 0.5,
        color: Some("#22C55E".to_string()),
        height: None,
    });
    session.start(&Program::single(vec![Stmt::Move(Expr::Num(60.0))]));
    session.run_for(300);

    assert!(session.history().detected_colors.iter().any(|c| c == "green"));
    assert!(record.0.borrow().is_empty(), "stale listener fired");
}

#[test]
fn test_color_listener_fires_once_per_crossing() {
    let recorder = Recorder::default();
    let record = recorder.clone();
    let mut session = Session::new().with_sink(Box::new(recorder));

    session.add_object(simcore::CustomObject {
        id: "l_green".to_string(),
        kind: simcore::ObjectKind::ColorLine,
        shape: None,
        x: 0.0,
        z: -3.0,
        rotation: 0.0,
        width: 2.5,
        length: 0.5,
        color: Some("#22C55E".to_string()),
        height: None,
    });

    let program = Program {
        scripts: vec![
            HatScript {
                trigger: Trigger::Start,
                body: vec![Stmt::Move(Expr::Num(60.0))],
            },
            HatScript {
                trigger: Trigger::Color("green".to_string()),
                body: vec![set("crossed", 1.0)],
            },
        ],
    };
    session.start(&program);
    session.run_for(300);

    let events = record.0.borrow();
    assert_eq!(
        events.iter().filter(|(name, _)| name == "crossed").count(),
        1,
        "listener fired {} times",
        events.len()
    );
}

#[test]
fn test_send_message_waits_for_handlers() {
    let recorder = Recorder::default();
    let record = recorder.clone();
    let mut session = Session::new().with_sink(Box::new(recorder));

    let program = Program {
        scripts: vec![
            HatScript {
                trigger: Trigger::Start,
                body: vec![
                    set("before", 1.0),
                    Stmt::SendMessage("go".to_string()),
                    set("after", 1.0),
                ],
            },
            HatScript {
                trigger: Trigger::Message("go".to_string()),
                body: vec![Stmt::Wait(Expr::Num(100.0)), set("handler", 1.0)],
            },
        ],
    };
    session.start(&program);
    session.run_for(30);

    let names: Vec<String> = record.0.borrow().iter().map(|(n, _)| n.clone()).collect();
    assert_eq!(names, vec!["before", "handler", "after"]);
}

#[test]
fn test_obstacle_listener_reacts_to_wall() {
    let recorder = Recorder::default();
    let record = recorder.clone();
    let mut session = Session::new().with_sink(Box::new(recorder));

    session.add_object(simcore::CustomObject {
        id: "w".to_string(),
        kind: simcore::ObjectKind::Wall,
        shape: None,
        x: 0.0,
        z: -6.0,
        rotation: 0.0,
        width: 6.0,
        length: 0.5,
        color: None,
        height: None,
    });

    let program = Program {
        scripts: vec![
            HatScript {
                trigger: Trigger::Start,
                body: vec![Stmt::SetMotorPower(Expr::Num(100.0), Expr::Num(100.0))],
            },
            HatScript {
                trigger: Trigger::Obstacle,
                body: vec![Stmt::Stop, set("hit", 1.0)],
            },
        ],
    };
    session.start(&program);
    session.run_for(300);

    assert_eq!(record.0.borrow().len(), 1);
    // The handler cut the motors once the bumper fired.
    assert_eq!(session.robot().motor_left, 0.0);
}

#[test]
fn test_script_error_terminates_run_cleanly() {
    let mut session = Session::new();
    session.start(&Program::single(vec![
        Stmt::Move(Expr::Var("undefined".to_string())),
    ]));
    session.tick();
    assert!(!session.is_running());
    // The session stays usable for the next run.
    session.start(&Program::single(vec![Stmt::Move(Expr::Num(10.0))]));
    session.run_for(100);
    assert!(session.history().max_distance_moved >= 10.0);
}
