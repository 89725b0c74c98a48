mod executor;
mod input_user;
mod replay;
mod stats;

use std::time;

use colored::Colorize;
use log::{debug, warn};

use executor::symbolic_setting::load_setting_from_json;
use input_user::Input;
use replay::{Replay, TraceFile};
use stats::path_stats::{
    print_path_summary_statistics_csv, print_path_summary_statistics_pretty, PathStatistics,
};

fn display_concolic_header() {
    let logo = r#"
           concolic
     Shadow Interpreter Replay
    "#;

    eprintln!("{}", logo.bright_cyan().bold());
    eprintln!("{}", "══════════════════════════════════".green());
}

fn main() {
    display_concolic_header();
    env_logger::init();

    let code = start();
    if code == exitcode::OK {
        eprintln!("{}", "Everything went okay".green());
    } else {
        eprintln!("{}", "previous errors were found".red());
    }
    std::process::exit(code);
}

fn start() -> exitcode::ExitCode {
    let start_time = time::Instant::now();

    let user_input = match Input::new() {
        Ok(input) => input,
        Err(()) => return exitcode::USAGE,
    };

    let mut setting = match &user_input.setting_path {
        Some(path) => match load_setting_from_json(path) {
            Ok(setting) => setting,
            Err(e) => {
                eprintln!("{} {}", "❌ Malformed setting:".red(), e);
                return exitcode::CONFIG;
            }
        },
        None => Default::default(),
    };
    user_input.apply(&mut setting);
    eprintln!("{}", setting);

    eprintln!("{}", "🧾 Loading Trace...".green());
    let replay = match TraceFile::load(&user_input.trace_path).and_then(Replay::new) {
        Ok(replay) => replay,
        Err(e) => {
            eprintln!("{} {}", "❌".red(), e);
            return exitcode::DATAERR;
        }
    };

    eprintln!(
        "{} {}",
        "🛒 Replaying Callbacks:".green(),
        replay.callbacks.len()
    );
    let executor = replay.run(setting);

    if user_input.dump_state {
        eprintln!("{}", executor.cur_state.lookup_fmt());
    }

    let path = executor.path_condition();
    eprintln!("{}", "══════════════════════════════════".green());
    println!("{}", path.lookup_fmt());
    let pending = executor.cur_state.path.pending_supporting();
    if !pending.is_empty() {
        debug!("{} supporting constraint(s) after the last branch", pending.len());
    }

    let mut stats = PathStatistics::new();
    stats.update(&path);
    if user_input.print_csv {
        print_path_summary_statistics_csv(&stats);
    } else {
        print_path_summary_statistics_pretty(&stats);
    }

    eprintln!(
        "{} {:?}",
        "⏱️ Elapsed:".bright_black(),
        start_time.elapsed()
    );

    for e in executor.errors() {
        warn!("{}", e);
    }
    if executor.is_failed() || !executor.errors().is_empty() {
        eprintln!(
            "{} {}",
            "💥 Tracking aborted:".red(),
            executor
                .first_error()
                .map(|e| e.to_string())
                .unwrap_or_default()
        );
        return exitcode::SOFTWARE;
    }
    exitcode::OK
}
