use std::io::Write;
use std::time::Instant;

use tracing::{debug, error, info, instrument};

use crate::command::CommandRunner;
use crate::error::BuildError;
use crate::observability::MetricsCollector;
use crate::plan::{PlannedStep, StagePlan, TargetTriple};

/// Builds and stages the library archive for each target, strictly in order.
///
/// Every command is echoed to `echo` as `> program args...` before it runs.
/// The first failing command ends the run; artifacts staged for earlier
/// targets are left in place.
pub struct Stager<'a, R, W> {
    plan: &'a StagePlan,
    runner: R,
    echo: W,
    metrics: MetricsCollector,
}

impl<'a, R, W> Stager<'a, R, W>
where
    R: CommandRunner,
    W: Write,
{
    pub fn new(plan: &'a StagePlan, runner: R, echo: W) -> Self {
        Self {
            plan,
            runner,
            echo,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn metrics(&self) -> MetricsCollector {
        self.metrics.clone()
    }

    pub fn into_echo(self) -> W {
        self.echo
    }

    /// Stage the targets listed in the plan.
    pub fn run_plan(&mut self) -> Result<(), BuildError> {
        let plan = self.plan;
        self.run(&plan.targets)
    }

    #[instrument(skip_all, fields(targets = targets.len()))]
    pub fn run(&mut self, targets: &[TargetTriple]) -> Result<(), BuildError> {
        self.metrics.reset();
        let started = Instant::now();
        for target in targets {
            self.stage_target(target)?;
        }
        self.metrics.record_total_duration(started.elapsed());
        Ok(())
    }

    #[instrument(skip_all, fields(target = %target))]
    fn stage_target(&mut self, target: &TargetTriple) -> Result<(), BuildError> {
        for planned in self.plan.steps(target) {
            self.execute(target, &planned)?;
        }
        self.metrics.record_target_staged();
        info!(
            archive = %self.plan.destination_archive(target),
            "Target staged"
        );
        Ok(())
    }

    fn execute(&mut self, target: &TargetTriple, planned: &PlannedStep) -> Result<(), BuildError> {
        let command = planned.invocation.to_string();
        writeln!(self.echo, "{}", planned.invocation.echo_line())
            .and_then(|()| self.echo.flush())
            .map_err(BuildError::Echo)?;

        let _timer = self.metrics.start_step(planned.step);
        let status = self
            .runner
            .run(&planned.invocation)
            .map_err(|source| BuildError::Spawn {
                step: planned.step,
                target: target.to_string(),
                command: command.clone(),
                source,
            })?;

        if !status.is_success() {
            error!(step = %planned.step, %status, "Command failed, aborting run");
            return Err(BuildError::CommandFailed {
                step: planned.step,
                target: target.to_string(),
                command,
                status,
            });
        }

        debug!(step = %planned.step, "Step completed");
        Ok(())
    }
}
