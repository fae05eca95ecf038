//! The simulation session: one robot, one arena, one run at a time.
//!
//! The session owns every piece of mutable state and drives the fixed-rate
//! tick: engine first (scripts write motor intents), then the integrator
//! (sole writer of pose), then event dispatch, history and the challenge
//! check. Success latches: once a run has satisfied the predicate it stays
//! satisfied until reset.

use simcore::objects::CustomObject;
use simcore::state::{RobotState, TrailSegment};
use simcore::SimError;

use crate::challenge::Challenge;
use crate::engine::{Engine, EngineCtx};
use crate::history::SimulationHistory;
use crate::integrator::Integrator;
use crate::monitor::{LogSink, VariableSink};
use crate::program::Program;

/// A manually placed start pose overriding the challenge's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartPose {
    pub x: f64,
    pub z: f64,
    pub rotation: f64,
}

pub struct Session {
    robot: RobotState,
    start_state: RobotState,
    engine: Engine,
    integrator: Integrator,
    history: SimulationHistory,
    challenge: Option<Challenge>,
    objects: Vec<CustomObject>,
    custom_start: Option<StartPose>,
    trail: Vec<TrailSegment>,
    sink: Box<dyn VariableSink>,
    running: bool,
    success: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let mut session = Self {
            robot: RobotState::default(),
            start_state: RobotState::default(),
            engine: Engine::new(),
            integrator: Integrator::new(),
            history: SimulationHistory::default(),
            challenge: None,
            objects: Vec::new(),
            custom_start: None,
            trail: Vec::new(),
            sink: Box::new(LogSink),
            running: false,
            success: false,
        };
        session.reset();
        session
    }

    /// Replace the monitoring sink (used by hosts that surface variables).
    pub fn with_sink(mut self, sink: Box<dyn VariableSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Select a challenge (or none for the free arena) and reset into it.
    pub fn set_challenge(&mut self, challenge: Option<Challenge>) {
        self.challenge = challenge;
        self.custom_start = None;
        self.reset();
    }

    /// Abort any run and restore the arena and robot to the start state.
    pub fn reset(&mut self) {
        self.engine.abort();
        self.integrator.reset();
        self.running = false;
        self.success = false;
        self.trail.clear();
        self.history.reset();

        self.objects = self
            .challenge
            .as_ref()
            .and_then(|c| c.environment_objects.clone())
            .unwrap_or_default();

        let (cx, cz, crot) = self
            .challenge
            .as_ref()
            .map(|c| c.start_pose())
            .unwrap_or_else(|| {
                let d = RobotState::default();
                (d.x, d.z, d.rotation)
            });
        let (x, z, rotation) = match self.custom_start {
            Some(pose) => (pose.x, pose.z, pose.rotation),
            None => (cx, cz, crot),
        };
        self.robot = RobotState::at(x, z, rotation);
        self.start_state = self.robot.clone();
    }

    /// Begin a new run of the given program. The robot keeps its current
    /// pose; history, listeners and the success latch start fresh.
    pub fn start(&mut self, program: &Program) {
        self.history.reset();
        self.success = false;
        self.engine.start(program);
        self.running = true;
    }

    /// Abort the current run, leaving the arena as it stands.
    pub fn stop(&mut self) {
        self.engine.abort();
        self.robot.motor_left = 0.0;
        self.robot.motor_right = 0.0;
        self.running = false;
    }

    /// Advance the simulation by one tick. Does nothing while stopped.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        let challenge_id = self.challenge.as_ref().map(|c| c.id.clone());
        {
            let mut ctx = EngineCtx {
                robot: &mut self.robot,
                objects: &self.objects,
                challenge_id: challenge_id.as_deref(),
                trail: &mut self.trail,
                sink: &mut *self.sink,
            };
            match self.engine.tick(&mut ctx) {
                Ok(()) => {}
                Err(SimError::Cancelled) => {}
                Err(err) => {
                    // Already logged by the engine; the run terminates but
                    // the session (and its tick loop) stays healthy.
                    log::warn!("run terminated: {err}");
                    self.engine.abort();
                    self.running = false;
                    return;
                }
            }
        }
        if self.engine.stop_requested() {
            self.engine.abort();
            self.running = false;
        }

        let reading = self.integrator.step(
            &mut self.robot,
            &self.objects,
            challenge_id.as_deref(),
            &mut self.trail,
        );

        self.engine.dispatch_events(&reading);
        self.history.record(
            &self.robot,
            &reading,
            self.start_state.x,
            self.start_state.z,
            self.start_state.rotation,
        );

        if let Some(challenge) = &self.challenge {
            if !self.success
                && challenge
                    .check
                    .evaluate(&self.start_state, &self.robot, &self.history)
            {
                self.success = true;
                log::info!("challenge '{}' solved", challenge.id);
            }
        }
    }

    /// Run up to `ticks` ticks, stopping early if the run ends.
    pub fn run_for(&mut self, ticks: u64) {
        for _ in 0..ticks {
            if !self.running {
                break;
            }
            self.tick();
        }
    }

    /// Override the start pose (manual robot placement in the builder).
    pub fn set_custom_start(&mut self, pose: Option<StartPose>) {
        self.custom_start = pose;
    }

    /// Add an object to the arena; invalid footprints are rejected.
    pub fn add_object(&mut self, object: CustomObject) {
        if object.is_valid() {
            self.objects.push(object);
        } else {
            log::warn!("rejecting object '{}' with empty footprint", object.id);
        }
    }

    /// Remove an object by id. Returns whether anything was removed.
    pub fn remove_object(&mut self, id: &str) -> bool {
        let before = self.objects.len();
        self.objects.retain(|o| o.id != id);
        self.objects.len() != before
    }

    pub fn robot(&self) -> &RobotState {
        &self.robot
    }

    pub fn history(&self) -> &SimulationHistory {
        &self.history
    }

    pub fn trail(&self) -> &[TrailSegment] {
        &self.trail
    }

    pub fn objects(&self) -> &[CustomObject] {
        &self.objects
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Expr, Stmt};

    #[test]
    fn test_session_idle_without_start() {
        let mut session = Session::new();
        session.tick();
        assert!(!session.is_running());
        assert_eq!(session.robot().z, 0.0);
    }

    #[test]
    fn test_run_completes_and_stops() {
        let mut session = Session::new();
        session.start(&Program::single(vec![Stmt::Move(Expr::Num(10.0))]));
        assert!(session.is_running());
        session.run_for(200);
        // The move finished; motors are back at zero.
        assert_eq!(session.robot().motor_left, 0.0);
        assert!(session.robot().z < -0.9);
    }

    #[test]
    fn test_reset_restores_start_state() {
        let mut session = Session::new();
        session.start(&Program::single(vec![Stmt::Move(Expr::Num(1000.0))]));
        session.run_for(50);
        assert!(session.robot().z < 0.0);

        session.reset();
        assert!(!session.is_running());
        assert_eq!(session.robot().z, 0.0);
        assert_eq!(session.history().max_distance_moved, 0.0);
        assert!(session.trail().is_empty());
    }

    #[test]
    fn test_custom_start_pose_applies_on_reset() {
        let mut session = Session::new();
        session.set_custom_start(Some(StartPose {
            x: 3.0,
            z: -4.0,
            rotation: 90.0,
        }));
        session.reset();
        assert_eq!(session.robot().x, 3.0);
        assert_eq!(session.robot().z, -4.0);
        assert_eq!(session.robot().rotation, 90.0);
    }

    #[test]
    fn test_object_add_remove() {
        let mut session = Session::new();
        session.add_object(CustomObject {
            id: "w1".to_string(),
            kind: simcore::ObjectKind::Wall,
            shape: None,
            x: 0.0,
            z: -5.0,
            rotation: 0.0,
            width: 1.0,
            length: 1.0,
            color: None,
            height: None,
        });
        assert_eq!(session.objects().len(), 1);
        assert!(session.remove_object("w1"));
        assert!(!session.remove_object("w1"));
        assert!(session.objects().is_empty());
    }
}
