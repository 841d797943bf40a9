use chrono::Local;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;

/// Set up the combined terminal + file logger. Log files are timestamped so
/// consecutive runs do not clobber each other. A second initialization (or
/// an unwritable log file) silently degrades to whatever logger is already
/// active.
pub fn init_logging(loglevel: &str) {
    let log_option = match loglevel {
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let name = format!("log_{}.txt", date_and_time);

    let term = TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
    let _ = match File::create(name) {
        Ok(log_file) => CombinedLogger::init(vec![
            term,
            WriteLogger::new(log_option, Config::default(), log_file),
        ]),
        Err(_) => CombinedLogger::init(vec![term]),
    };
}
