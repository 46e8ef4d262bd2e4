use std::sync::Arc;

use sitegate_core::gate;
use sitegate_core::model::validate_project_id;
use sitegate_core::qa::ArtifactSource;
use sitegate_core::report::console;
use sitegate_core::{
    load_gate_config, GateConfig, HttpArtifacts, KvArtifacts, KvHistory, QaAuditRunner,
    SiteClient, Verdict,
};

use super::{fail, Context};
use crate::cli::args::AuditArgs;
use crate::exit_codes::{FAILED, INFRA_ERROR, SUCCESS};

pub async fn run(ctx: &Context, args: AuditArgs) -> anyhow::Result<i32> {
    if let Err(e) = validate_project_id(&args.project) {
        return Ok(fail(&e));
    }
    let base = match &args.config {
        Some(path) => match load_gate_config(path) {
            Ok(cfg) => cfg,
            Err(e) => return Ok(fail(&e)),
        },
        None => GateConfig::default(),
    };
    let gate_config = args.apply(base);
    if let Err(e) = gate_config.validate() {
        return Ok(fail(&e));
    }

    let config = ctx.pipeline_config();
    let kv = match ctx.open_kv() {
        Ok(kv) => kv,
        Err(e) => return Ok(fail(&e)),
    };
    let artifacts: Arc<dyn ArtifactSource> = if args.remote_artifacts {
        match HttpArtifacts::new(config.base()) {
            Ok(a) => Arc::new(a),
            Err(e) => return Ok(fail(&e)),
        }
    } else {
        Arc::new(KvArtifacts::new(kv.clone()))
    };
    let site = match SiteClient::new(config.site()) {
        Ok(s) => s,
        Err(e) => return Ok(fail(&e)),
    };
    let history = Arc::new(KvHistory::new(kv, config.history_cap));

    let runner = QaAuditRunner::new(artifacts, site, history, gate_config);
    let report = runner.run(&args.project).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let (true, Some(summary)) = (args.summary, &report.release_gate) {
        let at = report.ended_at.unwrap_or(report.started_at);
        print!("{}", gate::summary_text(&report, summary, at));
    } else {
        print!("{}", console::format_audit(&report));
    }

    if report.error.is_some() {
        return Ok(INFRA_ERROR);
    }
    let verdict = report
        .release_gate
        .as_ref()
        .map(|g| g.verdict)
        .unwrap_or(Verdict::Fail);
    Ok(match verdict {
        Verdict::Pass => SUCCESS,
        Verdict::Warn if !args.fail_on_warn => SUCCESS,
        Verdict::Warn | Verdict::Fail => FAILED,
    })
}
