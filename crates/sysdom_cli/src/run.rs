//! `sysdom run`: elaborate and simulate a demo design.

use std::path::PathBuf;

use sysdom_common::Time;
use sysdom_config::{resolve_profile, ResolvedSettings};
use sysdom_diagnostics::{IssueRenderer, Severity, TerminalRenderer};
use sysdom_sim::{Kernel, RunOutcome, SimError};
use tracing::info;

use crate::{demo, project, GlobalArgs, RunArgs};

/// Runs the `sysdom run` command. Returns exit code 0 when no error issues
/// were reported, 1 otherwise.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = project::load(global)?;
    let settings = settings_for(args, &resolve_profile(&config, args.profile.as_deref())?)?;
    if let Some(path) = &settings.waveform {
        info!(path = %path.display(), "recording waveform");
    }

    let mut kernel = Kernel::from_settings(&settings)?;
    let duration = demo::build(args.demo, &mut kernel)?;
    if !global.quiet {
        eprintln!("   Simulating {:?}", args.demo);
    }

    match kernel.elaborate() {
        Ok(()) => {}
        Err(SimError::ElaborationFailed { .. }) => {
            render_issues(&kernel, global);
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    }

    let outcome = match settings.time_limit {
        Some(_) => kernel.run()?,
        None => kernel.run_until(duration)?,
    };
    kernel.stop()?;

    render_issues(&kernel, global);
    if !global.quiet {
        let stats = kernel.stats();
        eprintln!(
            "    Finished at {} ({}): {} time steps, {} delta cycles, {} activations",
            kernel.now(),
            outcome_label(outcome),
            stats.time_steps,
            stats.delta_cycles,
            stats.activations,
        );
    }
    Ok(if kernel.issues().has_errors() { 1 } else { 0 })
}

/// Applies the command-line overrides to the resolved profile.
fn settings_for(args: &RunArgs, base: &ResolvedSettings) -> Result<ResolvedSettings, Box<dyn std::error::Error>> {
    let mut settings = base.clone();
    if let Some(time) = &args.time {
        settings.time_limit = Some(time.parse::<Time>()?);
    }
    if let Some(vcd) = &args.vcd {
        settings.waveform = Some(PathBuf::from(vcd));
    }
    Ok(settings)
}

fn render_issues(kernel: &Kernel, global: &GlobalArgs) {
    let renderer = TerminalRenderer::new(global.color);
    for issue in kernel.issues().issues() {
        if global.quiet && issue.severity != Severity::Error {
            continue;
        }
        eprint!("{}", renderer.render(&issue));
    }
}

fn outcome_label(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Idle => "idle",
        RunOutcome::TimeLimit => "time limit",
        RunOutcome::Stopped => "stop requested",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Demo;
    use sysdom_config::CONFIG_FILE_NAME;
    use tempfile::TempDir;

    fn args(demo: Demo) -> RunArgs {
        RunArgs {
            demo,
            profile: None,
            time: None,
            vcd: None,
        }
    }

    fn global_in(dir: &TempDir) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(dir.path().to_str().unwrap().to_string()),
        }
    }

    #[test]
    fn overrides_replace_profile_values() {
        let tmp = TempDir::new().unwrap();
        let config = project::load(&global_in(&tmp)).unwrap();
        let base = resolve_profile(&config, None).unwrap();
        let mut a = args(Demo::Counter);
        a.time = Some("250ns".into());
        a.vcd = Some("w.vcd".into());
        let s = settings_for(&a, &base).unwrap();
        assert_eq!(s.time_limit, Some(Time::ns(250)));
        assert_eq!(s.waveform, Some(PathBuf::from("w.vcd")));

        a.time = Some("soon".into());
        assert!(settings_for(&a, &base).is_err());
    }

    #[test]
    fn memory_demo_runs_clean_and_writes_vcd() {
        let tmp = TempDir::new().unwrap();
        let vcd = tmp.path().join("out").join("mem.vcd");
        let mut a = args(Demo::Memory);
        a.vcd = Some(vcd.to_str().unwrap().to_string());
        assert_eq!(run(&a, &global_in(&tmp)).unwrap(), 0);
        let text = std::fs::read_to_string(&vcd).unwrap();
        assert!(text.contains("$scope module ram $end"));
        assert!(text.contains("dout_b"));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "[simulation]\n").unwrap();
        let mut a = args(Demo::Counter);
        a.profile = Some("nope".into());
        assert!(run(&a, &global_in(&tmp)).is_err());
    }

    #[test]
    fn profile_time_limit_bounds_the_counter() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[profiles.short]\ntime_limit = \"50ns\"\n",
        )
        .unwrap();
        let mut a = args(Demo::Counter);
        a.profile = Some("short".into());
        assert_eq!(run(&a, &global_in(&tmp)).unwrap(), 0);
    }
}
