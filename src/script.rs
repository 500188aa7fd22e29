use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::control::{ControlLoop, SceneBinding};

/// One line of an input script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Down(String),
    Up(String),
    Tick(u32),
    Release,
    Print,
}

/// Key events and ticks replayed against a [`ControlLoop`].
///
/// ```text
/// # slew for 50 ticks
/// down a
/// tick 50
/// up a
/// print
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputScript {
    pub commands: Vec<ScriptCommand>,
}

impl InputScript {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid script {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut commands = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let command = parse_command(line).with_context(|| format!("line {}", index + 1))?;
            commands.push(command);
        }
        Ok(Self { commands })
    }

    pub fn total_ticks(&self) -> u64 {
        self.commands
            .iter()
            .map(|command| match command {
                ScriptCommand::Tick(count) => u64::from(*count),
                _ => 0,
            })
            .sum()
    }

    /// Replays the script, returning the lines produced by `print`.
    pub fn run<B: SceneBinding>(&self, control: &mut ControlLoop<B>) -> Result<Vec<String>> {
        let mut printed = Vec::new();
        for command in &self.commands {
            match command {
                ScriptCommand::Down(key) => {
                    control.handle_key(key, true);
                }
                ScriptCommand::Up(key) => {
                    control.handle_key(key, false);
                }
                ScriptCommand::Tick(count) => {
                    for _ in 0..*count {
                        control.tick().context("tick failed")?;
                    }
                }
                ScriptCommand::Release => control.release_all(),
                ScriptCommand::Print => printed.push(control.latest_snapshot().to_string()),
            }
        }
        Ok(printed)
    }
}

fn parse_command(line: &str) -> Result<ScriptCommand> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let argument = words.next();
    if let Some(extra) = words.next() {
        return Err(anyhow!("unexpected argument {extra:?}"));
    }

    let key = |verb: &str| {
        argument
            .map(str::to_string)
            .ok_or_else(|| anyhow!("`{verb}` needs a key name"))
    };

    match verb.as_str() {
        "down" => Ok(ScriptCommand::Down(key("down")?)),
        "up" => Ok(ScriptCommand::Up(key("up")?)),
        "tick" => {
            let count = match argument {
                Some(value) => value
                    .parse::<u32>()
                    .map_err(|err| anyhow!("bad tick count {value:?}: {err}"))?,
                None => 1,
            };
            Ok(ScriptCommand::Tick(count))
        }
        "release" | "print" if argument.is_some() => {
            Err(anyhow!("`{verb}` takes no argument"))
        }
        "release" => Ok(ScriptCommand::Release),
        "print" => Ok(ScriptCommand::Print),
        other => Err(anyhow!(
            "unknown command {other:?}; expected down, up, tick, release or print"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::ForwardKinematics;
    use crate::rig::Rig;
    use crate::scene_graph::SceneGraph;

    #[test]
    fn parses_commands_and_comments() {
        let script = InputScript::parse(
            "# warm up\n\
             down A\n\
             tick 3   # three frames\n\
             \n\
             up a\n\
             tick\n\
             release\n\
             print\n",
        )
        .unwrap();
        assert_eq!(
            script.commands,
            vec![
                ScriptCommand::Down("A".into()),
                ScriptCommand::Tick(3),
                ScriptCommand::Up("a".into()),
                ScriptCommand::Tick(1),
                ScriptCommand::Release,
                ScriptCommand::Print,
            ]
        );
        assert_eq!(script.total_ticks(), 4);
    }

    #[test]
    fn errors_name_the_line() {
        let err = InputScript::parse("down q\njump\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
        assert!(InputScript::parse("tick many").is_err());
        assert!(InputScript::parse("down").is_err());
        assert!(InputScript::parse("print now").is_err());
        assert!(InputScript::parse("down q e").is_err());
    }

    #[test]
    fn run_replays_against_the_loop() {
        let rig = Rig::default();
        let graph = SceneGraph::from_rig(&rig);
        let mut control = ControlLoop::new(ForwardKinematics::new(rig.geometry));
        control.start(graph.clone()).unwrap();

        let script = InputScript::parse("down s\ntick 10\nup s\ntick 5\nprint").unwrap();
        let printed = script.run(&mut control).unwrap();

        assert_eq!(control.tick_count(), 15);
        assert_eq!(graph.frames_rendered(), 15);
        assert!((control.state().cable_length - 6.0).abs() < 1e-9);
        assert_eq!(printed, vec!["Boom: 63% | Cable: 6.0 | Rotation: 0° | Trolley: 0.0"]);
    }
}
