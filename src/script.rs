//! Command scripts for the headless driver
//!
//! A script is a list of commands separated by newlines or `;`. Text after
//! `#` is a comment. Everything except `wait` maps onto one agent call;
//! `wait` lets simulated time pass before the next command is issued.
//!
//! ```text
//! show
//! speak Hello there!     # speech text runs to the end of the command
//! play Wave 2000         # optional timeout in ms
//! move 100 200 500
//! wait 3000
//! hide
//! ```

use std::time::Duration;

use crate::engine::types::DEFAULT_MOVE_DURATION;
use crate::engine::Agent;

/// One script command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show { fast: bool },
    Hide { fast: bool },
    Play { name: String, timeout: Option<Duration> },
    Animate,
    Speak { text: String, hold: bool },
    CloseBalloon,
    Move { x: f64, y: f64, duration: Duration },
    Gesture { x: f64, y: f64 },
    Stop,
    StopCurrent,
    Delay(Duration),
    Pause,
    Resume,
    SetPosition { x: f64, y: f64 },
    DragStart { x: f64, y: f64 },
    Drag { x: f64, y: f64 },
    DragEnd,
    Wait(Duration),
}

/// A script line that could not be understood
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl Command {
    /// Issue this command against `agent`; `Wait` advances its clock
    pub fn apply(&self, agent: &mut Agent) {
        match self {
            Command::Show { fast } => agent.show(*fast),
            Command::Hide { fast } => agent.hide(*fast, None),
            Command::Play { name, timeout } => agent.play(name, *timeout, None),
            Command::Animate => agent.animate(),
            Command::Speak { text, hold } => agent.speak(text, *hold),
            Command::CloseBalloon => agent.close_balloon(),
            Command::Move { x, y, duration } => agent.move_to(*x, *y, *duration),
            Command::Gesture { x, y } => agent.gesture_at(*x, *y),
            Command::Stop => agent.stop(),
            Command::StopCurrent => agent.stop_current(),
            Command::Delay(d) => agent.delay(*d),
            Command::Pause => agent.pause(),
            Command::Resume => agent.resume(),
            Command::SetPosition { x, y } => agent.set_position(*x, *y),
            Command::DragStart { x, y } => agent.start_drag(*x, *y),
            Command::Drag { x, y } => agent.update_drag(*x, *y),
            Command::DragEnd => agent.end_drag(),
            Command::Wait(d) => agent.advance(*d),
        }
    }
}

/// Parse a whole script
pub fn parse_script(text: &str) -> Result<Vec<Command>, ScriptError> {
    let mut commands = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let code = line.split('#').next().unwrap_or("");
        for part in code.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let command = parse_command(part).map_err(|message| ScriptError {
                line: line_no,
                message,
            })?;
            commands.push(command);
        }
    }
    Ok(commands)
}

fn parse_command(text: &str) -> Result<Command, String> {
    let (word, rest) = match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match word.to_lowercase().as_str() {
        "show" => Command::Show {
            fast: fast_flag(&args)?,
        },
        "hide" => Command::Hide {
            fast: fast_flag(&args)?,
        },
        "play" => {
            let name = args.first().ok_or("play needs an animation name")?;
            let timeout = args.get(1).map(|v| millis(v)).transpose()?;
            expect_at_most(&args, 2)?;
            Command::Play {
                name: name.to_string(),
                timeout,
            }
        }
        "animate" => no_args(&args, Command::Animate)?,
        "speak" | "say" => Command::Speak {
            text: rest.to_string(),
            hold: false,
        },
        "speak-hold" | "hold" => Command::Speak {
            text: rest.to_string(),
            hold: true,
        },
        "close" => no_args(&args, Command::CloseBalloon)?,
        "move" => {
            let (x, y) = point(&args)?;
            let duration = args
                .get(2)
                .map(|v| millis(v))
                .transpose()?
                .unwrap_or(DEFAULT_MOVE_DURATION);
            expect_at_most(&args, 3)?;
            Command::Move { x, y, duration }
        }
        "gesture" => {
            let (x, y) = point(&args)?;
            expect_at_most(&args, 2)?;
            Command::Gesture { x, y }
        }
        "stop" => no_args(&args, Command::Stop)?,
        "stop-current" => no_args(&args, Command::StopCurrent)?,
        "delay" => Command::Delay(single_millis(&args)?),
        "pause" => no_args(&args, Command::Pause)?,
        "resume" => no_args(&args, Command::Resume)?,
        "position" => {
            let (x, y) = point(&args)?;
            expect_at_most(&args, 2)?;
            Command::SetPosition { x, y }
        }
        "drag-start" => {
            let (x, y) = point(&args)?;
            expect_at_most(&args, 2)?;
            Command::DragStart { x, y }
        }
        "drag" => {
            let (x, y) = point(&args)?;
            expect_at_most(&args, 2)?;
            Command::Drag { x, y }
        }
        "drag-end" => no_args(&args, Command::DragEnd)?,
        "wait" => Command::Wait(single_millis(&args)?),
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(command)
}

fn fast_flag(args: &[&str]) -> Result<bool, String> {
    match args {
        [] => Ok(false),
        ["fast"] => Ok(true),
        _ => Err(format!("expected 'fast' or nothing, got '{}'", args.join(" "))),
    }
}

fn no_args(args: &[&str], command: Command) -> Result<Command, String> {
    expect_at_most(args, 0)?;
    Ok(command)
}

fn expect_at_most(args: &[&str], n: usize) -> Result<(), String> {
    if args.len() > n {
        return Err(format!("unexpected argument '{}'", args[n]));
    }
    Ok(())
}

fn millis(s: &str) -> Result<Duration, String> {
    s.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| format!("invalid milliseconds '{}'", s))
}

fn single_millis(args: &[&str]) -> Result<Duration, String> {
    let value = args.first().ok_or("missing milliseconds")?;
    expect_at_most(args, 1)?;
    millis(value)
}

fn coord(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid coordinate '{}'", s)),
    }
}

fn point(args: &[&str]) -> Result<(f64, f64), String> {
    match args {
        [x, y, ..] => Ok((coord(x)?, coord(y)?)),
        _ => Err("expected X Y".to_string()),
    }
}

/// Run `commands` against `agent`, stepping the clock one `frame` at a
/// time through each `wait`, then keep running until the clock reaches
/// `until`
pub fn run_script(agent: &mut Agent, commands: &[Command], frame: Duration, until: Duration) {
    for command in commands {
        match command {
            Command::Wait(d) => advance_in_frames(agent, *d, frame),
            other => other.apply(agent),
        }
    }

    let remaining = until.saturating_sub(agent.now());
    advance_in_frames(agent, remaining, frame);
}

fn advance_in_frames(agent: &mut Agent, total: Duration, frame: Duration) {
    if frame.is_zero() {
        agent.advance(total);
        return;
    }
    let mut left = total;
    while !left.is_zero() {
        let step = left.min(frame);
        agent.advance(step);
        left -= step;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::engine::{AgentConfig, AgentOptions, Animation, Frame};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[rstest]
    #[case("show", Command::Show { fast: false })]
    #[case("show fast", Command::Show { fast: true })]
    #[case("hide fast", Command::Hide { fast: true })]
    #[case("play Wave", Command::Play { name: "Wave".into(), timeout: None })]
    #[case("play Wave 500", Command::Play { name: "Wave".into(), timeout: Some(ms(500)) })]
    #[case("speak  Hello   there ", Command::Speak { text: "Hello   there".into(), hold: false })]
    #[case("hold Wait for me", Command::Speak { text: "Wait for me".into(), hold: true })]
    #[case("move 10 -20", Command::Move { x: 10.0, y: -20.0, duration: DEFAULT_MOVE_DURATION })]
    #[case("move 10 20 250", Command::Move { x: 10.0, y: 20.0, duration: ms(250) })]
    #[case("gesture 1.5 2", Command::Gesture { x: 1.5, y: 2.0 })]
    #[case("delay 300", Command::Delay(ms(300)))]
    #[case("drag-start 1 2", Command::DragStart { x: 1.0, y: 2.0 })]
    #[case("STOP-CURRENT", Command::StopCurrent)]
    #[case("wait 10", Command::Wait(ms(10)))]
    fn test_parse_command(#[case] text: &str, #[case] expected: Command) {
        assert_eq!(parse_command(text).unwrap(), expected);
    }

    #[rstest]
    #[case("dance")]
    #[case("play")]
    #[case("play Wave soon")]
    #[case("move 10")]
    #[case("move x y")]
    #[case("delay")]
    #[case("delay -5")]
    #[case("stop now")]
    #[case("show slowly")]
    fn test_parse_command_errors(#[case] text: &str) {
        assert!(parse_command(text).is_err());
    }

    #[test]
    fn test_parse_script_lines_and_comments() {
        let script = "show; speak Hi\n# just a comment\n\nplay Wave # trailing\nwait 100";
        let commands = parse_script(script).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Show { fast: false },
                Command::Speak {
                    text: "Hi".into(),
                    hold: false
                },
                Command::Play {
                    name: "Wave".into(),
                    timeout: None
                },
                Command::Wait(ms(100)),
            ]
        );
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("show\nplay Wave\nbogus").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.to_string().starts_with("line 3:"));
    }

    #[test]
    fn test_run_script_advances_clock() {
        let config = AgentConfig::new(
            1,
            [10, 10],
            Vec::new(),
            vec![("Wave".to_string(), Animation::new(vec![Frame::new(100); 3]))],
        )
        .unwrap();
        let mut agent = Agent::new(Arc::new(config), AgentOptions::default());

        let commands = parse_script("play Wave; wait 150").unwrap();
        run_script(&mut agent, &commands, ms(16), ms(1000));
        assert_eq!(agent.now(), ms(1000));
        assert_eq!(agent.current_animation(), None);
    }

    #[test]
    fn test_run_script_wait_beyond_until() {
        let config = AgentConfig::new(1, [10, 10], Vec::new(), Vec::new()).unwrap();
        let mut agent = Agent::new(Arc::new(config), AgentOptions::default());
        run_script(&mut agent, &[Command::Wait(ms(500))], ms(16), ms(100));
        assert_eq!(agent.now(), ms(500));
    }
}
