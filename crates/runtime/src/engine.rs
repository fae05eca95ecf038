//! The script execution engine.
//!
//! Hat scripts run as cooperative tasks sharing the simulation clock. Each
//! engine tick steps every runnable task until it suspends; suspension
//! points are `wait`, each control iteration of `move`/`turn`, loop
//! back-edges (one iteration per tick, so a body can never starve the
//! clock), and `sendMessage` joins.
//!
//! Cancellation is generation-based: reset, stop and every new run bump the
//! generation, and any task observed under a stale generation finishes with
//! the silent `Cancelled` outcome. Genuine script errors are logged and
//! terminate the run without harming the tick loop.

use std::collections::HashMap;
use std::mem;

use arena::{environment, sensors, SensorReading};
use simcore::color;
use simcore::constants::{CM_TO_WORLD, TICK_MS, WHEEL_CIRCUMFERENCE};
use simcore::objects::CustomObject;
use simcore::state::{GyroMode, RobotState, TrailSegment};
use simcore::SimError;

use crate::events::Listeners;
use crate::monitor::VariableSink;
use crate::program::{CmpOp, Cond, Expr, Program, Stmt, Trigger};

/// Proportional gain and power floor for `move` (per world unit remaining).
const MOVE_GAIN: f64 = 120.0;
const MOVE_MIN_POWER: f64 = 15.0;
/// Proportional gain and power floor for `turn` (per degree remaining).
const TURN_GAIN: f64 = 20.0;
const TURN_MIN_POWER: f64 = 8.0;
/// Angular tolerance for `turn` loop exit (degrees).
const TURN_TOLERANCE: f64 = 0.2;

pub type TaskId = u64;

/// Everything a tick needs from the session: the robot, the current object
/// set (environments are re-resolved per sensor query, never cached), the
/// active challenge id, the pen trail and the monitoring sink.
pub struct EngineCtx<'a> {
    pub robot: &'a mut RobotState,
    pub objects: &'a [CustomObject],
    pub challenge_id: Option<&'a str>,
    pub trail: &'a mut Vec<TrailSegment>,
    pub sink: &'a mut dyn VariableSink,
}

impl EngineCtx<'_> {
    /// Fresh sensor reading at the robot's current pose.
    fn sense(&self) -> SensorReading {
        let env = environment::resolve(self.challenge_id, self.objects);
        sensors::compute(self.robot.x, self.robot.z, self.robot.rotation, &env)
    }
}

/// Why a frame was entered; controls what happens when its pc runs out.
#[derive(Debug, Clone)]
enum FrameCtrl {
    /// Plain sequence (if-branch, handler body, script body).
    Seq,
    Repeat { remaining: u64 },
    While(Cond),
    Forever,
}

#[derive(Debug, Clone)]
struct Frame {
    body: Vec<Stmt>,
    pc: usize,
    ctrl: FrameCtrl,
}

/// What a task is currently suspended on.
#[derive(Debug, Clone)]
enum BlockState {
    /// Runnable: execute statements now.
    Ready,
    /// Sleeping for a number of ticks.
    Ticks(u64),
    /// Driving toward a target distance under proportional control.
    Moving {
        start_x: f64,
        start_z: f64,
        target: f64,
        dir: f64,
        /// Distance covered as of the previous control tick; no progress
        /// while driving means the chassis is pressed against a wall.
        last_moved: f64,
    },
    /// Turning toward a target heading delta under proportional control.
    Turning {
        start_rotation: f64,
        angle: f64,
        dir: f64,
    },
    /// Waiting for spawned message handlers to finish.
    Join(Vec<TaskId>),
    /// Yielded at a loop back-edge; resumes next tick.
    LoopEdge,
}

#[derive(Debug)]
struct Task {
    id: TaskId,
    generation: u64,
    frames: Vec<Frame>,
    block: BlockState,
}

impl Task {
    fn is_done(&self) -> bool {
        self.frames.is_empty()
    }

    /// Placeholder left in the task list while a task is being stepped;
    /// reads as done so the end-of-tick sweep discards it if not restored.
    fn tombstone() -> Self {
        Task {
            id: 0,
            generation: 0,
            frames: Vec::new(),
            block: BlockState::Ready,
        }
    }
}

/// The cooperative script engine for one session.
#[derive(Debug, Default)]
pub struct Engine {
    generation: u64,
    tasks: Vec<Task>,
    listeners: Listeners,
    variables: HashMap<String, f64>,
    next_task: TaskId,
    stop_requested: bool,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate the current run: bump the generation, drop all tasks,
    /// listeners and variables. Tasks that were still pending finish with
    /// the silent cancelled outcome.
    pub fn abort(&mut self) {
        if !self.tasks.is_empty() {
            log::debug!(
                "run {} cancelled with {} pending task(s)",
                self.generation,
                self.tasks.len()
            );
        }
        self.generation += 1;
        self.tasks.clear();
        self.listeners.clear();
        self.variables.clear();
        self.stop_requested = false;
    }

    /// Begin a new run of the given program: previous run invalidated,
    /// start scripts spawned, every other hat script registered as a
    /// listener.
    pub fn start(&mut self, program: &Program) {
        self.abort();
        for script in &program.scripts {
            match &script.trigger {
                Trigger::Start => {
                    self.spawn(script.body.clone());
                }
                other => self.listeners.register(other, script.body.clone()),
            }
        }
        log::info!(
            "run {} started: {} task(s), {} hat script(s) total",
            self.generation,
            self.tasks.len(),
            program.scripts.len()
        );
    }

    fn spawn(&mut self, body: Vec<Stmt>) -> TaskId {
        self.next_task += 1;
        let id = self.next_task;
        self.tasks.push(Task {
            id,
            generation: self.generation,
            frames: vec![Frame {
                body,
                pc: 0,
                ctrl: FrameCtrl::Seq,
            }],
            block: BlockState::Ready,
        });
        id
    }

    /// Whether any task is still live.
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether a script asked the whole run to stop.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Spawn handler tasks for this tick's rising-edge listener matches.
    pub fn dispatch_events(&mut self, reading: &SensorReading) {
        let released = self.listeners.rising_edges(reading);
        for body in released {
            self.spawn(body);
        }
    }

    /// Step every task once. Returns a script error if a task failed;
    /// cancelled tasks are discarded silently.
    pub fn tick(&mut self, ctx: &mut EngineCtx) -> Result<(), SimError> {
        let mut idx = 0;
        while idx < self.tasks.len() {
            let mut task = mem::replace(&mut self.tasks[idx], Task::tombstone());
            match self.step_task(&mut task, ctx) {
                Ok(()) => {
                    self.tasks[idx] = task;
                }
                Err(err) if err.is_cancelled() => {
                    log::debug!("task {} cancelled", task.id);
                }
                Err(err) => {
                    log::error!("task {} failed: {err}", task.id);
                    self.tasks.retain(|t| !t.is_done());
                    return Err(err);
                }
            }
            idx += 1;
        }
        self.tasks.retain(|t| !t.is_done());
        Ok(())
    }

    /// Advance one task: resolve its suspension, then run statements until
    /// the next suspension point.
    fn step_task(&mut self, task: &mut Task, ctx: &mut EngineCtx) -> Result<(), SimError> {
        if self.stop_requested || task.generation != self.generation {
            return Err(SimError::Cancelled);
        }

        let runnable = match task.block.clone() {
            BlockState::Ready | BlockState::LoopEdge => true,
            BlockState::Ticks(remaining) => {
                if remaining <= 1 {
                    true
                } else {
                    task.block = BlockState::Ticks(remaining - 1);
                    false
                }
            }
            BlockState::Moving {
                start_x,
                start_z,
                target,
                dir,
                last_moved,
            } => match Self::control_move(ctx, start_x, start_z, target, dir, Some(last_moved)) {
                Some(moved) => {
                    task.block = BlockState::Moving {
                        start_x,
                        start_z,
                        target,
                        dir,
                        last_moved: moved,
                    };
                    false
                }
                None => true,
            },
            BlockState::Turning {
                start_rotation,
                angle,
                dir,
            } => Self::control_turn(ctx, start_rotation, angle, dir),
            BlockState::Join(ids) => self.join_complete(&ids),
        };

        if runnable {
            task.block = BlockState::Ready;
            self.run_statements(task, ctx)?;
        }
        Ok(())
    }

    fn join_complete(&self, ids: &[TaskId]) -> bool {
        !self
            .tasks
            .iter()
            .any(|t| ids.contains(&t.id) && !t.is_done())
    }

    /// One proportional-control iteration of a pending `move`. Returns the
    /// distance covered so far to keep driving, or `None` when done: target
    /// reached, hard contact, or no progress against a wall.
    fn control_move(
        ctx: &mut EngineCtx,
        start_x: f64,
        start_z: f64,
        target: f64,
        dir: f64,
        last_moved: Option<f64>,
    ) -> Option<f64> {
        let moved = ctx.robot.distance_from(start_x, start_z);
        let remaining = target - moved;
        let stalled = last_moved.is_some_and(|prev| moved - prev < 1e-9);
        if remaining <= 0.0 || stalled || ctx.sense().physical_hit {
            ctx.robot.motor_left = 0.0;
            ctx.robot.motor_right = 0.0;
            return None;
        }
        let power = (remaining * MOVE_GAIN).clamp(MOVE_MIN_POWER, 100.0) * dir;
        ctx.robot.motor_left = power;
        ctx.robot.motor_right = power;
        Some(moved)
    }

    /// One proportional-control iteration of a pending `turn`. Exits inside
    /// the angular tolerance or on overshoot past the target.
    fn control_turn(ctx: &mut EngineCtx, start_rotation: f64, angle: f64, dir: f64) -> bool {
        let turned = ctx.robot.rotation - start_rotation;
        let remaining = angle - turned;
        if remaining.abs() < TURN_TOLERANCE || remaining.signum() != dir {
            ctx.robot.motor_left = 0.0;
            ctx.robot.motor_right = 0.0;
            return true;
        }
        let power = (remaining.abs() * TURN_GAIN).clamp(TURN_MIN_POWER, 100.0);
        ctx.robot.motor_left = -power * dir;
        ctx.robot.motor_right = power * dir;
        false
    }

    /// Execute statements until the task suspends or finishes.
    fn run_statements(&mut self, task: &mut Task, ctx: &mut EngineCtx) -> Result<(), SimError> {
        loop {
            let Some(frame) = task.frames.last_mut() else {
                return Ok(());
            };

            if frame.pc >= frame.body.len() {
                let again = match frame.ctrl.clone() {
                    FrameCtrl::Seq => false,
                    FrameCtrl::Repeat { remaining } => {
                        if remaining > 1 {
                            if let Some(f) = task.frames.last_mut() {
                                f.ctrl = FrameCtrl::Repeat {
                                    remaining: remaining - 1,
                                };
                            }
                            true
                        } else {
                            false
                        }
                    }
                    FrameCtrl::While(cond) => self.eval_cond(&cond, ctx)?,
                    FrameCtrl::Forever => true,
                };
                if again {
                    if let Some(f) = task.frames.last_mut() {
                        f.pc = 0;
                    }
                    task.block = BlockState::LoopEdge;
                    return Ok(());
                }
                task.frames.pop();
                continue;
            }

            let stmt = frame.body[frame.pc].clone();
            frame.pc += 1;

            match stmt {
                Stmt::Move(distance) => {
                    let cm = self.eval_expr(&distance, ctx)?;
                    let start_x = ctx.robot.x;
                    let start_z = ctx.robot.z;
                    let target = cm.abs() * CM_TO_WORLD;
                    let dir = if cm < 0.0 { -1.0 } else { 1.0 };
                    if let Some(moved) = Self::control_move(ctx, start_x, start_z, target, dir, None)
                    {
                        task.block = BlockState::Moving {
                            start_x,
                            start_z,
                            target,
                            dir,
                            last_moved: moved,
                        };
                        return Ok(());
                    }
                }
                Stmt::Turn(angle) => {
                    let degrees = self.eval_expr(&angle, ctx)?;
                    let start_rotation = ctx.robot.rotation;
                    let dir = if degrees < 0.0 { -1.0 } else { 1.0 };
                    if !Self::control_turn(ctx, start_rotation, degrees, dir) {
                        task.block = BlockState::Turning {
                            start_rotation,
                            angle: degrees,
                            dir,
                        };
                        return Ok(());
                    }
                }
                Stmt::Wait(duration) => {
                    let ms = self.eval_expr(&duration, ctx)?;
                    if ms > 0.0 {
                        let ticks = ((ms / TICK_MS as f64).round() as u64).max(1);
                        task.block = BlockState::Ticks(ticks);
                        return Ok(());
                    }
                }
                Stmt::SetMotorPower(left, right) => {
                    ctx.robot.motor_left = self.eval_expr(&left, ctx)?.clamp(-100.0, 100.0);
                    ctx.robot.motor_right = self.eval_expr(&right, ctx)?.clamp(-100.0, 100.0);
                }
                Stmt::SetSpeed(speed) => {
                    ctx.robot.speed = self.eval_expr(&speed, ctx)?.clamp(0.0, 100.0);
                }
                Stmt::Stop => {
                    ctx.robot.motor_left = 0.0;
                    ctx.robot.motor_right = 0.0;
                }
                Stmt::SetPen(down) => {
                    ctx.robot.pen_down = down;
                }
                Stmt::SetPenColor(pen_color) => {
                    ctx.robot.pen_color = pen_color;
                }
                Stmt::ClearPen => {
                    ctx.trail.clear();
                }
                Stmt::SetLed(side, led_color) => {
                    ctx.robot.set_led(side, &led_color);
                }
                Stmt::SendMessage(message) => {
                    let handlers = self.listeners.handlers_for(&message);
                    if !handlers.is_empty() {
                        let ids: Vec<TaskId> =
                            handlers.into_iter().map(|body| self.spawn(body)).collect();
                        task.block = BlockState::Join(ids);
                        return Ok(());
                    }
                }
                Stmt::SetVariable(name, value) => {
                    let v = self.eval_expr(&value, ctx)?;
                    self.variables.insert(name.clone(), v);
                    ctx.sink.variable_changed(&name, v);
                }
                Stmt::StopProgram => {
                    self.stop_requested = true;
                    return Err(SimError::Cancelled);
                }
                Stmt::Repeat(count, body) => {
                    let n = self.eval_expr(&count, ctx)?.floor();
                    if n >= 1.0 && !body.is_empty() {
                        task.frames.push(Frame {
                            body,
                            pc: 0,
                            ctrl: FrameCtrl::Repeat {
                                remaining: n as u64,
                            },
                        });
                    }
                }
                Stmt::While(cond, body) => {
                    if !body.is_empty() && self.eval_cond(&cond, ctx)? {
                        task.frames.push(Frame {
                            body,
                            pc: 0,
                            ctrl: FrameCtrl::While(cond),
                        });
                    }
                }
                Stmt::Forever(body) => {
                    task.frames.push(Frame {
                        body,
                        pc: 0,
                        ctrl: FrameCtrl::Forever,
                    });
                }
                Stmt::If(cond, body) => {
                    if self.eval_cond(&cond, ctx)? && !body.is_empty() {
                        task.frames.push(Frame {
                            body,
                            pc: 0,
                            ctrl: FrameCtrl::Seq,
                        });
                    }
                }
                Stmt::IfElse(cond, then_body, else_body) => {
                    let body = if self.eval_cond(&cond, ctx)? {
                        then_body
                    } else {
                        else_body
                    };
                    if !body.is_empty() {
                        task.frames.push(Frame {
                            body,
                            pc: 0,
                            ctrl: FrameCtrl::Seq,
                        });
                    }
                }
            }
        }
    }

    fn eval_expr(&self, expr: &Expr, ctx: &EngineCtx) -> Result<f64, SimError> {
        Ok(match expr {
            Expr::Num(v) => *v,
            Expr::Var(name) => *self.variables.get(name).ok_or_else(|| {
                SimError::Script(format!("unknown variable '{name}'"))
            })?,
            Expr::Distance => ctx.sense().distance_cm,
            Expr::Gyro(GyroMode::Angle) => ctx.sense().gyro,
            Expr::Gyro(GyroMode::Tilt) => ctx.sense().tilt,
            Expr::Circumference => WHEEL_CIRCUMFERENCE,
            Expr::Add(a, b) => self.eval_expr(a, ctx)? + self.eval_expr(b, ctx)?,
            Expr::Sub(a, b) => self.eval_expr(a, ctx)? - self.eval_expr(b, ctx)?,
            Expr::Mul(a, b) => self.eval_expr(a, ctx)? * self.eval_expr(b, ctx)?,
            Expr::Div(a, b) => self.eval_expr(a, ctx)? / self.eval_expr(b, ctx)?,
        })
    }

    fn eval_cond(&self, cond: &Cond, ctx: &EngineCtx) -> Result<bool, SimError> {
        Ok(match cond {
            Cond::Touching => ctx.sense().is_touching,
            Cond::TouchingColor(c) => {
                let reading = ctx.sense();
                color::color_close(&color::to_hex(reading.raw_color), c)
            }
            Cond::ColorIs(c) => ctx.sense().color.eq_ignore_ascii_case(c),
            Cond::Cmp(op, a, b) => {
                let (a, b) = (self.eval_expr(a, ctx)?, self.eval_expr(b, ctx)?);
                match op {
                    CmpOp::Lt => a < b,
                    CmpOp::Le => a <= b,
                    CmpOp::Gt => a > b,
                    CmpOp::Ge => a >= b,
                    CmpOp::Eq => a == b,
                }
            }
            Cond::Not(inner) => !self.eval_cond(inner, ctx)?,
            Cond::All(conds) => {
                let mut result = true;
                for c in conds {
                    result &= self.eval_cond(c, ctx)?;
                }
                result
            }
            Cond::Any(conds) => {
                let mut result = false;
                for c in conds {
                    result |= self.eval_cond(c, ctx)?;
                }
                result
            }
        })
    }
}
