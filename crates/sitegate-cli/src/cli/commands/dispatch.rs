use super::super::args::*;
use super::Context;
use crate::exit_codes::SUCCESS;
use sitegate_core::RunMode;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let ctx = Context {
        db: cli.db,
        base_url: cli.base_url,
        site_url: cli.site_url,
    };
    match cli.cmd {
        Command::Run(args) => super::run::run(&ctx, args, RunMode::Run).await,
        Command::Job(args) => super::run::run(&ctx, args, RunMode::Job).await,
        Command::Status(args) => super::status::status(&ctx, args),
        Command::Jobs(args) => super::status::jobs(&ctx, args),
        Command::Cancel(args) => super::status::cancel(&ctx, args),
        Command::Audit(args) => super::audit::run(&ctx, args).await,
        Command::Diff(args) => super::diff::run(args),
        Command::History(args) => super::history::run(&ctx, args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
