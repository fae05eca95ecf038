//! Edge-triggered event listeners.
//!
//! Each listener is an explicit two-state machine (Idle ⇄ Triggered)
//! updated exactly once per tick from the tick's final sensor reading. A
//! handler body is released only on the rising edge, so a condition that
//! stays true fires once per entry. Listener tables belong to one run and
//! are cleared whenever a new run starts.

use arena::SensorReading;
use simcore::color;

use crate::program::{Stmt, Trigger};

/// Per-listener edge detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeState {
    #[default]
    Idle,
    Triggered,
}

impl EdgeState {
    /// Feed the current match state; returns true on the rising edge.
    fn update(&mut self, matched: bool) -> bool {
        let rising = matched && *self == EdgeState::Idle;
        *self = if matched {
            EdgeState::Triggered
        } else {
            EdgeState::Idle
        };
        rising
    }
}

#[derive(Debug, Clone)]
struct ColorWatch {
    color: String,
    body: Vec<Stmt>,
    state: EdgeState,
}

#[derive(Debug, Clone)]
struct ObstacleWatch {
    body: Vec<Stmt>,
    state: EdgeState,
}

#[derive(Debug, Clone)]
struct DistanceWatch {
    threshold: f64,
    body: Vec<Stmt>,
    state: EdgeState,
}

/// All listeners registered by the current run.
#[derive(Debug, Default)]
pub struct Listeners {
    messages: Vec<(String, Vec<Stmt>)>,
    colors: Vec<ColorWatch>,
    obstacles: Vec<ObstacleWatch>,
    distances: Vec<DistanceWatch>,
}

impl Listeners {
    pub fn clear(&mut self) {
        self.messages.clear();
        self.colors.clear();
        self.obstacles.clear();
        self.distances.clear();
    }

    /// Register a non-start hat script.
    pub fn register(&mut self, trigger: &Trigger, body: Vec<Stmt>) {
        match trigger {
            Trigger::Message(name) => self.messages.push((name.clone(), body)),
            Trigger::Color(c) => self.colors.push(ColorWatch {
                color: c.clone(),
                body,
                state: EdgeState::Idle,
            }),
            Trigger::Obstacle => self.obstacles.push(ObstacleWatch {
                body,
                state: EdgeState::Idle,
            }),
            Trigger::Distance(threshold) => self.distances.push(DistanceWatch {
                threshold: *threshold,
                body,
                state: EdgeState::Idle,
            }),
            Trigger::Start => {
                // Start scripts are spawned directly by the engine.
                log::warn!("start script passed to listener table; ignored");
            }
        }
    }

    /// Handler bodies for a broadcast message, in registration order.
    pub fn handlers_for(&self, message: &str) -> Vec<Vec<Stmt>> {
        self.messages
            .iter()
            .filter(|(name, _)| name == message)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Update every edge detector against this tick's reading and return the
    /// handler bodies released by rising edges, in registration order per
    /// listener kind.
    pub fn rising_edges(&mut self, reading: &SensorReading) -> Vec<Vec<Stmt>> {
        let mut released = Vec::new();
        let current_hex = color::to_hex(reading.raw_color);

        for watch in &mut self.colors {
            let matched = color::color_close(&current_hex, &watch.color);
            if watch.state.update(matched) {
                released.push(watch.body.clone());
            }
        }
        for watch in &mut self.obstacles {
            if watch.state.update(reading.is_touching) {
                released.push(watch.body.clone());
            }
        }
        for watch in &mut self.distances {
            let matched = reading.distance_cm < watch.threshold;
            if watch.state.update(matched) {
                released.push(watch.body.clone());
            }
        }
        released
    }
}
