//! The block-program intermediate representation.
//!
//! The visual editor (out of scope) emits a program as data, not text: a
//! set of hat scripts, each a start trigger plus a statement tree over the
//! fixed robot API. The engine interprets this tree directly, so there is
//! no dynamic code evaluation anywhere in the simulator.
//!
//! Units on the API surface are fixed by contract: distances in
//! centimeters-equivalent, angles in degrees, time in milliseconds, motor
//! power in -100..100.

use serde::{Deserialize, Serialize};

use simcore::{GyroMode, LedSide};

/// A numeric expression over constants, variables and sensor queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Expr {
    Num(f64),
    Var(String),
    /// Ultrasonic distance in centimeters.
    Distance,
    /// Gyro reading: heading angle or tilt.
    Gyro(GyroMode),
    /// Wheel circumference, a constant on the API surface.
    Circumference,
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

/// Comparison operators for [`Cond::Cmp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

/// A boolean condition over the sensor surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cond {
    /// Touch sensor pressed.
    Touching,
    /// Zone color under the sensor is close to the given color (name or hex).
    TouchingColor(String),
    /// Sensor color name equals the given name.
    ColorIs(String),
    Cmp(CmpOp, Expr, Expr),
    Not(Box<Cond>),
    All(Vec<Cond>),
    Any(Vec<Cond>),
}

/// One statement of a script body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stmt {
    /// Drive the given distance (cm, signed) with proportional control.
    Move(Expr),
    /// Turn in place by the given angle (degrees, signed).
    Turn(Expr),
    /// Suspend for the given duration (ms).
    Wait(Expr),
    SetMotorPower(Expr, Expr),
    SetSpeed(Expr),
    Stop,
    SetPen(bool),
    SetPenColor(String),
    ClearPen,
    SetLed(LedSide, String),
    /// Broadcast; suspends until every handler for the message finishes.
    SendMessage(String),
    /// Assign a variable and report it to the monitoring sink.
    SetVariable(String, Expr),
    /// Abort the whole run.
    StopProgram,
    Repeat(Expr, Vec<Stmt>),
    While(Cond, Vec<Stmt>),
    Forever(Vec<Stmt>),
    If(Cond, Vec<Stmt>),
    IfElse(Cond, Vec<Stmt>, Vec<Stmt>),
}

/// Start condition of a hat script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// Runs when the program starts.
    Start,
    /// Runs when the named message is broadcast.
    Message(String),
    /// Runs on the rising edge of the touch sensor.
    Obstacle,
    /// Runs on the rising edge of a color match under the sensor.
    Color(String),
    /// Runs on the rising edge of distance dropping below the threshold (cm).
    Distance(f64),
}

/// A top-level script: a trigger and its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HatScript {
    pub trigger: Trigger,
    pub body: Vec<Stmt>,
}

/// A complete user program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub scripts: Vec<HatScript>,
}

impl Program {
    /// A program with a single start script.
    pub fn single(body: Vec<Stmt>) -> Self {
        Self {
            scripts: vec![HatScript {
                trigger: Trigger::Start,
                body,
            }],
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Expr {
    pub fn num(v: f64) -> Expr {
        Expr::Num(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_json_round_trip() {
        let program = Program {
            scripts: vec![
                HatScript {
                    trigger: Trigger::Start,
                    body: vec![
                        Stmt::Move(Expr::Num(100.0)),
                        Stmt::Repeat(
                            Expr::Num(4.0),
                            vec![Stmt::Turn(Expr::Num(90.0)), Stmt::Move(Expr::Num(50.0))],
                        ),
                    ],
                },
                HatScript {
                    trigger: Trigger::Color("red".to_string()),
                    body: vec![Stmt::Stop, Stmt::StopProgram],
                },
            ],
        };
        let json = serde_json::to_string(&program).unwrap();
        let back = Program::from_json(&json).unwrap();
        assert_eq!(program, back);
    }

    #[test]
    fn test_condition_tree_deserializes() {
        let json = r##"{
            "scripts": [{
                "trigger": "obstacle",
                "body": [{"while": [
                    {"not": {"colorIs": "green"}},
                    [{"setMotorPower": [{"num": 30.0}, {"num": 30.0}]}]
                ]}]
            }]
        }"##;
        let program = Program::from_json(json).unwrap();
        assert_eq!(program.scripts.len(), 1);
        assert_eq!(program.scripts[0].trigger, Trigger::Obstacle);
    }
}
