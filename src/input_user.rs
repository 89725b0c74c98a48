use clap::{App, Arg, ArgMatches};

use crate::executor::symbolic_setting::ExecutorSetting;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command-line options of the replay tool.
pub struct Input {
    pub trace_path: String,
    pub setting_path: Option<String>,
    pub print_csv: bool,
    pub dump_state: bool,
    pub keep_going: bool,
}

impl Input {
    pub fn new() -> Result<Input, ()> {
        Input::from_matches(&view().get_matches())
    }

    pub fn from_args<I, T>(args: I) -> Result<Input, ()>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = view().get_matches_from_safe(args).map_err(|e| {
            eprintln!("{}", e.message);
        })?;
        Input::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Input, ()> {
        let trace_path = matches.value_of("trace").ok_or(())?.to_string();
        Ok(Input {
            trace_path,
            setting_path: matches.value_of("setting").map(|s| s.to_string()),
            print_csv: matches.is_present("csv"),
            dump_state: matches.is_present("dump_state"),
            keep_going: matches.is_present("keep_going"),
        })
    }

    /// Applies command-line overrides on top of the loaded setting.
    pub fn apply(&self, setting: &mut ExecutorSetting) {
        if self.keep_going {
            setting.abort_on_error = false;
        }
    }
}

fn view() -> App<'static, 'static> {
    App::new("concolic")
        .version(VERSION)
        .about("Replays a recorded callback trace and prints its path condition")
        .arg(
            Arg::with_name("trace")
                .value_name("TRACE")
                .required(true)
                .takes_value(true)
                .help("Recorded trace (JSON)"),
        )
        .arg(
            Arg::with_name("setting")
                .short("c")
                .long("setting")
                .value_name("SETTING")
                .takes_value(true)
                .help("Executor setting (JSON); defaults are used when missing"),
        )
        .arg(
            Arg::with_name("csv")
                .long("csv")
                .help("Prints path statistics as CSV"),
        )
        .arg(
            Arg::with_name("dump_state")
                .long("dump-state")
                .help("Prints the final symbolic state"),
        )
        .arg(
            Arg::with_name("keep_going")
                .long("keep-going")
                .help("Skips failing callbacks instead of aborting the execution"),
        )
}
