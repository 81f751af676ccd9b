use anyhow::{Context, Result};
use bulkstore_core::SimTick;
use serde::Deserialize;
use std::{collections::VecDeque, fs, path::Path};

#[derive(Debug, Deserialize)]
struct CommandScriptFile {
    steps: Vec<CommandScriptStepDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct CommandScriptStepDef {
    tick: u64,
    command: String,
}

#[derive(Debug, Clone)]
struct CommandScriptStep {
    tick: SimTick,
    command: String,
}

/// Deterministic command script runner.
///
/// Scripts are a list of `{tick, command}` steps, executed in file order.
#[derive(Debug)]
pub struct CommandScriptPlayer {
    pending: VecDeque<CommandScriptStep>,
}

impl CommandScriptPlayer {
    /// Load a command script from a JSON file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read command script {}", path.display()))?;
        Self::parse(&contents)
    }

    /// Load a command script from an in-memory JSON string.
    pub fn parse(contents: &str) -> Result<Self> {
        let file: CommandScriptFile =
            serde_json::from_str(contents).context("malformed command script")?;
        if file.steps.is_empty() {
            anyhow::bail!("command script contains no steps");
        }

        let mut pending = VecDeque::with_capacity(file.steps.len());
        let mut last_tick = 0;
        for step in file.steps {
            let command = step.command.trim().to_string();
            if command.is_empty() {
                anyhow::bail!("command script contains an empty command");
            }
            if step.tick < last_tick {
                anyhow::bail!("command script steps must be sorted by tick");
            }
            last_tick = step.tick;

            pending.push_back(CommandScriptStep {
                tick: SimTick(step.tick),
                command,
            });
        }

        Ok(Self { pending })
    }

    /// Drain and return all commands scheduled for ticks `<= tick`.
    pub fn drain_ready_commands(&mut self, tick: SimTick) -> Vec<String> {
        let ready = self
            .pending
            .iter()
            .take_while(|step| step.tick <= tick)
            .count();
        self.pending
            .drain(..ready)
            .map(|step| step.command)
            .collect()
    }

    /// Tick of the last scheduled step.
    pub fn last_tick(&self) -> Option<SimTick> {
        self.pending.back().map(|step| step.tick)
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}
