use anyhow::Context as _;
use sitegate_core::DiffSession;

use crate::cli::args::DiffArgs;
use crate::exit_codes::{FAILED, SUCCESS};

pub fn run(args: DiffArgs) -> anyhow::Result<i32> {
    let a = std::fs::read_to_string(&args.a)
        .with_context(|| format!("failed to read {}", args.a.display()))?;
    let b = std::fs::read_to_string(&args.b)
        .with_context(|| format!("failed to read {}", args.b.display()))?;

    let mut session = DiffSession::new(&a, &b)
        .with_labels(args.a.display().to_string(), args.b.display().to_string())
        .with_radius(args.radius);
    session.jump_to(args.at);

    if args.block {
        print!("{}", session.diff_block(&args.project, &args.kind));
    } else {
        println!("{}", session.label());
        if !session.is_match() {
            let (left, right) = session.context();
            print!("{}", left.render(&args.a.display().to_string()));
            print!("{}", right.render(&args.b.display().to_string()));
        }
    }

    Ok(if session.is_match() { SUCCESS } else { FAILED })
}
