// src/exec/command.rs

//! Building `tokio::process::Command`s for rule commands.

use std::collections::BTreeMap;
use std::process::Stdio;

use anyhow::{Result, anyhow};
use tokio::process::Command;

use crate::types::ExecSpec;

/// Build a shell command appropriate for the platform.
pub fn shell_command(script: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(script);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(script);
        c
    }
}

/// Build the command for a rule's `exec`.
///
/// Argument vectors are executed directly and never see a shell.
pub fn build_command(exec: &ExecSpec) -> Result<Command> {
    match exec {
        ExecSpec::Shell(script) => Ok(shell_command(script)),
        ExecSpec::Argv(argv) => {
            let (program, args) = argv
                .split_first()
                .ok_or_else(|| anyhow!("empty argument vector"))?;
            let mut c = Command::new(program);
            c.args(args);
            Ok(c)
        }
    }
}

/// Give the command its private environment and wire up stdio.
///
/// Without capture both output streams go to the null device.
pub fn configure(cmd: &mut Command, env: &BTreeMap<String, String>, capture: bool) {
    let out = || if capture { Stdio::piped() } else { Stdio::null() };

    cmd.env_clear()
        .envs(env)
        .stdin(Stdio::null())
        .stdout(out())
        .stderr(out())
        .kill_on_drop(true);
}
