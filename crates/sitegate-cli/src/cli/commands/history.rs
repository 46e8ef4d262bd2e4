use sitegate_core::report::console;
use sitegate_core::{AuditHistory, KvHistory};

use super::{fail, Context};
use crate::cli::args::HistoryArgs;
use crate::exit_codes::SUCCESS;

pub fn run(ctx: &Context, args: HistoryArgs) -> anyhow::Result<i32> {
    if let Err(e) = sitegate_core::model::validate_project_id(&args.project) {
        return Ok(fail(&e));
    }
    let kv = match ctx.open_kv() {
        Ok(kv) => kv,
        Err(e) => return Ok(fail(&e)),
    };
    let history = KvHistory::new(kv, ctx.pipeline_config().history_cap);

    if args.clear {
        return match history.clear(&args.project) {
            Ok(()) => {
                println!("History cleared for {}", args.project);
                Ok(SUCCESS)
            }
            Err(e) => Ok(fail(&e)),
        };
    }

    let items = match history.get(&args.project) {
        Ok(items) => items,
        Err(e) => return Ok(fail(&e)),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        print!("{}", console::format_history(&items));
    }
    Ok(SUCCESS)
}
