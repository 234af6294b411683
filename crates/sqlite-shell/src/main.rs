use clap::Parser;

use sqlite_shell::{adapters::script_bridge, cli::Args, logging, AppResult};

fn main() -> AppResult<()> {
    let args = Args::parse();
    logging::init(&args.log_level);
    tracing::info!(sqlite_bin = %args.sqlite_bin, db = ?args.db, "starting sqlite shell bridge");
    script_bridge::run(args)
}
