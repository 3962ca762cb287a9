//! Simulation runner
//!
//! Applies parsed commands to a coordinator and renders results as text.
//! The clock advances exactly once per processed command, whatever the
//! command's outcome.

use std::io::Write;

use super::errors::ScriptResult;
use super::parser::{parse_script, Command};
use crate::config::SimulationConfig;
use crate::coordinator::{
    CommitOutcome, Coordinator, ReadOutcome, RecoveryEvent, RecoveryReport, WriteOutcome,
};
use crate::model::TransactionId;
use crate::observability::{log_event_with_fields, Event};
use crate::site::ReadValue;

#[derive(Debug)]
pub struct Simulation {
    coordinator: Coordinator,
}

impl Simulation {
    pub fn new(config: &SimulationConfig) -> ScriptResult<Self> {
        Ok(Self {
            coordinator: Coordinator::from_config(config)?,
        })
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Applies one command, writes its rendered output to `out`, then
    /// advances the clock.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> ScriptResult<()> {
        let result = self.apply(command, out);
        self.coordinator.tick();
        result
    }

    /// Parses `text` and executes every command in order. Returns the
    /// number of commands executed.
    ///
    /// Nothing runs if any line fails to parse.
    pub fn run_script<W: Write>(&mut self, text: &str, out: &mut W) -> ScriptResult<usize> {
        let commands = match parse_script(text) {
            Ok(commands) => commands,
            Err(e) => {
                log_event_with_fields(Event::ParseFailed, &[("error", &e.to_string())]);
                return Err(e);
            }
        };
        log_event_with_fields(
            Event::SimulationStart,
            &[("commands", &commands.len().to_string())],
        );

        for &(_, command) in &commands {
            self.execute(command, out)?;
        }

        log_event_with_fields(
            Event::SimulationComplete,
            &[("tick", &self.coordinator.now().to_string())],
        );
        Ok(commands.len())
    }

    fn apply<W: Write>(&mut self, command: Command, out: &mut W) -> ScriptResult<()> {
        match command {
            Command::Begin(t) => self.coordinator.begin(t)?,
            Command::Read(t, x) => match self.coordinator.read(t, x)? {
                ReadOutcome::Value(value) => render_read(out, t, &value)?,
                ReadOutcome::Pending => writeln!(out, "{} put on wait since site is down", command)?,
                ReadOutcome::Aborted(_) => render_abort(out, t)?,
                ReadOutcome::Rejected => {}
            },
            Command::Write(t, x, v) => match self.coordinator.write(t, x, v)? {
                WriteOutcome::Pending => writeln!(out, "{} put on wait since site is down", command)?,
                WriteOutcome::Accepted { .. } | WriteOutcome::Rejected => {}
            },
            Command::End(t) => match self.coordinator.commit(t)? {
                CommitOutcome::Committed(_) => writeln!(out, "{} commits", t)?,
                CommitOutcome::Aborted(_) => render_abort(out, t)?,
                CommitOutcome::Rejected => {}
            },
            Command::Fail(site) => {
                for victim in self.coordinator.fail(site)? {
                    render_abort(out, victim)?;
                }
            }
            Command::Recover(site) => {
                let report = self.coordinator.recover(site)?;
                render_recovery(out, &report)?;
            }
            Command::Dump => {
                for site in self.coordinator.dump() {
                    writeln!(out, "{}", site)?;
                }
            }
        }
        Ok(())
    }
}

fn render_read<W: Write>(out: &mut W, t: TransactionId, value: &ReadValue) -> ScriptResult<()> {
    writeln!(out, "{}: {} ({})", value.variable, value.value, t)?;
    Ok(())
}

fn render_abort<W: Write>(out: &mut W, t: TransactionId) -> ScriptResult<()> {
    writeln!(out, "{} aborts", t)?;
    Ok(())
}

fn render_recovery<W: Write>(out: &mut W, report: &RecoveryReport) -> ScriptResult<()> {
    for event in &report.events {
        match event {
            RecoveryEvent::ReadServed(t, value) => render_read(out, *t, value)?,
            RecoveryEvent::Aborted(t, _) => render_abort(out, *t)?,
            RecoveryEvent::WriteApplied(..) => {}
        }
    }
    Ok(())
}
