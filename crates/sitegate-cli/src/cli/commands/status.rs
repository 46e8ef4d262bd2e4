use sitegate_core::report::console;
use sitegate_core::{Orchestrator, PipelineError, Run, RunStore};

use super::{fail, Context};
use crate::cli::args::{CancelArgs, ProjectArg, StatusArgs};
use crate::exit_codes::SUCCESS;

fn orchestrator(ctx: &Context) -> Result<Orchestrator, PipelineError> {
    let kv = ctx.open_kv()?;
    Orchestrator::new(RunStore::new(kv), ctx.pipeline_config())
}

fn print_run(run: &Run, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(run)?);
    } else {
        print!("{}", console::format_run(run));
    }
    Ok(())
}

pub fn status(ctx: &Context, args: StatusArgs) -> anyhow::Result<i32> {
    let found = orchestrator(ctx).and_then(|o| match &args.job {
        Some(job_id) => o.job(job_id),
        None => o.latest_run(&args.project),
    });
    match found {
        Ok(Some(run)) => {
            print_run(&run, args.json)?;
            Ok(SUCCESS)
        }
        Ok(None) => {
            let what = match &args.job {
                Some(job_id) => format!("job {job_id}"),
                None => format!("run for project {}", args.project),
            };
            Ok(fail(&PipelineError::NotFound { what }))
        }
        Err(e) => Ok(fail(&e)),
    }
}

pub fn jobs(ctx: &Context, args: ProjectArg) -> anyhow::Result<i32> {
    match orchestrator(ctx).and_then(|o| o.recent_jobs(&args.project)) {
        Ok(ids) => {
            if ids.is_empty() {
                println!("No jobs recorded.");
            }
            for id in ids {
                println!("{id}");
            }
            Ok(SUCCESS)
        }
        Err(e) => Ok(fail(&e)),
    }
}

pub fn cancel(ctx: &Context, args: CancelArgs) -> anyhow::Result<i32> {
    let requested = orchestrator(ctx).and_then(|o| match &args.job {
        Some(job_id) => o.cancel_job(job_id),
        None => o.request_cancel(&args.project),
    });
    match requested {
        Ok(run) => {
            println!("Cancel requested for {}", run.run_id);
            Ok(SUCCESS)
        }
        Err(e) => Ok(fail(&e)),
    }
}
