use std::time::Duration;

use sitegate_core::report::console;
use sitegate_core::{cancel_pair, Orchestrator, RunMode, RunRequest, RunStore};
use tracing::info;

use super::{fail, Context};
use crate::cli::args::RunArgs;
use crate::exit_codes::{FAILED, SUCCESS};

pub async fn run(ctx: &Context, args: RunArgs, mode: RunMode) -> anyhow::Result<i32> {
    let mut config = ctx.pipeline_config();
    if let Some(secs) = args.timeout {
        config = config.with_step_timeout(Duration::from_secs(secs));
    }

    let kv = match ctx.open_kv() {
        Ok(kv) => kv,
        Err(e) => return Ok(fail(&e)),
    };
    let orchestrator = match Orchestrator::new(RunStore::new(kv), config) {
        Ok(o) => o,
        Err(e) => return Ok(fail(&e)),
    };

    // Ctrl-C stops the pipeline before its next step instead of killing the process.
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling");
            handle.cancel();
        }
    });

    let request = RunRequest::new(args.project.clone(), args.preset).with_overrides(args.overrides());
    let result = match mode {
        RunMode::Run => orchestrator.run_preset(&request, Some(signal)).await,
        RunMode::Job => orchestrator.run_job(&request, Some(signal)).await,
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => return Ok(fail(&e)),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output.run)?);
    } else {
        print!("{}", console::format_run(&output.run));
    }

    Ok(if output.is_success() { SUCCESS } else { FAILED })
}
