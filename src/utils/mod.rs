pub mod clock;
pub mod file_utils;
pub mod log_utils;

pub use clock::{Clock, FixedClock, SystemClock};
pub use file_utils::{sanitize_filename, save_raw_report};
pub use log_utils::append_run_log;
