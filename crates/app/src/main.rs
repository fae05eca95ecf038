//! Headless simulation runner.
//!
//! Loads a challenge and a block program from JSON files and drives the
//! session on the fixed tick clock, reporting the outcome on the log.
//!
//! Usage: robolab [--challenge FILE] [--program FILE] [--ticks N] [--realtime]
//!
//! Without a program file a built-in demo runs: pen down, drive a square,
//! report the distance covered.

use std::fs;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use runtime::challenge::Challenge;
use runtime::program::{Expr, Program, Stmt};
use runtime::session::Session;
use simcore::constants::TICK_MS;

/// Default simulated run length when no --ticks is given (about 60 s).
const DEFAULT_TICKS: u64 = 3750;

struct Options {
    challenge: Option<String>,
    program: Option<String>,
    ticks: u64,
    realtime: bool,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options {
        challenge: None,
        program: None,
        ticks: DEFAULT_TICKS,
        realtime: false,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--challenge" => {
                options.challenge = Some(args.next().ok_or("--challenge needs a file")?);
            }
            "--program" => {
                options.program = Some(args.next().ok_or("--program needs a file")?);
            }
            "--ticks" => {
                let value = args.next().ok_or("--ticks needs a number")?;
                options.ticks = value.parse().map_err(|_| format!("bad tick count '{value}'"))?;
            }
            "--realtime" => options.realtime = true,
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(options)
}

/// The built-in demo: drive a square with the pen down.
fn demo_program() -> Program {
    Program::single(vec![
        Stmt::SetPen(true),
        Stmt::SetPenColor("#3B82F6".to_string()),
        Stmt::Repeat(
            Expr::Num(4.0),
            vec![Stmt::Move(Expr::Num(50.0)), Stmt::Turn(Expr::Num(90.0))],
        ),
        Stmt::SetPen(false),
    ])
}

fn run() -> Result<(), String> {
    let options = parse_args()?;

    let mut session = Session::new();

    if let Some(path) = &options.challenge {
        let json = fs::read_to_string(path)
            .map_err(|err| format!("cannot read challenge '{path}': {err}"))?;
        let challenge = Challenge::from_json(&json)
            .map_err(|err| format!("cannot parse challenge '{path}': {err}"))?;
        log::info!("challenge: {} ({})", challenge.title, challenge.id);
        session.set_challenge(Some(challenge));
    }

    let program = match &options.program {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|err| format!("cannot read program '{path}': {err}"))?;
            Program::from_json(&json)
                .map_err(|err| format!("cannot parse program '{path}': {err}"))?
        }
        None => {
            log::info!("no program given; running the square demo");
            demo_program()
        }
    };

    session.start(&program);
    for _ in 0..options.ticks {
        if !session.is_running() {
            break;
        }
        session.tick();
        if options.realtime {
            thread::sleep(Duration::from_millis(TICK_MS));
        }
    }

    let robot = session.robot();
    let history = session.history();
    log::info!(
        "finished at ({:.2}, {:.2}) heading {:.1}",
        robot.x,
        robot.z,
        robot.rotation
    );
    log::info!(
        "history: {:.1} cm max distance, {:.1} deg rotation, touched wall: {}, colors: {:?}",
        history.max_distance_moved,
        history.total_rotation,
        history.touched_wall,
        history.detected_colors
    );
    if session.challenge().is_some() {
        log::info!(
            "challenge {}",
            if session.success() { "SOLVED" } else { "not solved" }
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("logger init");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
