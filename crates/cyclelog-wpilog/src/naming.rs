//! Automatic log file naming.
//!
//! A log starts under a random name. Once the wall clock can be trusted
//! the name switches to the log's start date, and match and event details
//! are appended as they appear in the logged driver-station fields.

use std::time::Duration;

use chrono::NaiveDateTime;
use cyclelog_core::Table;

/// Logged flag: driver station connected.
pub const DS_ATTACHED_KEY: &str = "DriverStation/DSAttached";
/// Logged flag: system wall clock synchronised.
pub const SYSTEM_TIME_VALID_KEY: &str = "SystemStats/SystemTimeValid";
/// Logged match type (0 none, 1 practice, 2 qualification, 3 elimination).
pub const MATCH_TYPE_KEY: &str = "DriverStation/MatchType";
/// Logged match number.
pub const MATCH_NUMBER_KEY: &str = "DriverStation/MatchNumber";
/// Logged event name.
pub const EVENT_NAME_KEY: &str = "DriverStation/EventName";

const FILE_PREFIX: &str = "cyclelog_";
const DATE_FORMAT: &str = "%y-%m-%d_%H-%M-%S";

/// Tracks naming state across cycles for one log file.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use chrono::NaiveDate;
/// use cyclelog_core::Table;
/// use cyclelog_wpilog::LogNamer;
///
/// let mut namer = LogNamer::with_id("00000000deadbeef", true, Duration::from_secs(5));
/// assert_eq!(namer.current_name(), "cyclelog_00000000deadbeef.wpilog");
///
/// let now = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap().and_hms_opt(9, 26, 53).unwrap();
/// let table = Table::new(0);
/// table.put("DriverStation/MatchType", 2i64);
/// table.put("DriverStation/MatchNumber", 42i64);
/// table.put("DriverStation/EventName", "CAFR");
/// assert_eq!(namer.observe(&table, || now), "cyclelog_26-03-14_09-26-53_cafr_q42.wpilog");
/// ```
#[derive(Clone, Debug)]
pub struct LogNamer {
    random_id: String,
    assume_time_valid: bool,
    time_valid_delay_us: i64,
    valid_since: Option<i64>,
    log_date: Option<NaiveDateTime>,
    match_text: Option<String>,
    event_name: String,
}

impl LogNamer {
    /// A namer with a fresh random 16-hex-digit id.
    pub fn new(assume_time_valid: bool, time_valid_delay: Duration) -> Self {
        let id = format!("{:016x}", rand::random::<u64>());
        Self::with_id(id, assume_time_valid, time_valid_delay)
    }

    /// A namer with a fixed id.
    pub fn with_id(id: impl Into<String>, assume_time_valid: bool, time_valid_delay: Duration) -> Self {
        Self {
            random_id: id.into(),
            assume_time_valid,
            time_valid_delay_us: i64::try_from(time_valid_delay.as_micros()).unwrap_or(i64::MAX),
            valid_since: None,
            log_date: None,
            match_text: None,
            event_name: String::new(),
        }
    }

    /// The random id used until the date is known.
    pub fn random_id(&self) -> &str {
        &self.random_id
    }

    /// The file name for the current state.
    pub fn current_name(&self) -> String {
        let mut name = String::from(FILE_PREFIX);
        match &self.log_date {
            Some(date) => name.push_str(&date.format(DATE_FORMAT).to_string()),
            None => name.push_str(&self.random_id),
        }
        if !self.event_name.is_empty() {
            name.push('_');
            name.push_str(&self.event_name);
        }
        if let Some(text) = &self.match_text {
            name.push('_');
            name.push_str(text);
        }
        name.push_str(".wpilog");
        name
    }

    /// Update from one cycle's table and return the name to use.
    ///
    /// The clock counts as valid once the driver station is attached and
    /// the system time is synchronised, and has stayed so for the
    /// configured delay of cycle time (or immediately when time is assumed
    /// valid). `now` is only called at that moment.
    pub fn observe(&mut self, table: &Table, now: impl FnOnce() -> NaiveDateTime) -> String {
        if self.log_date.is_none() {
            let attached =
                table.get(DS_ATTACHED_KEY, false) && table.get(SYSTEM_TIME_VALID_KEY, false);
            if self.assume_time_valid {
                self.log_date = Some(now());
            } else if attached {
                let ts = table.timestamp();
                match self.valid_since {
                    None => self.valid_since = Some(ts),
                    Some(since) if ts.saturating_sub(since) > self.time_valid_delay_us => {
                        self.log_date = Some(now());
                    }
                    Some(_) => {}
                }
            } else {
                self.valid_since = None;
            }
        }

        if self.match_text.is_none() {
            let letter = match table.get(MATCH_TYPE_KEY, 0i64) {
                1 => Some('p'),
                2 => Some('q'),
                3 => Some('e'),
                _ => None,
            };
            if let Some(letter) = letter {
                self.match_text = Some(format!("{letter}{}", table.get(MATCH_NUMBER_KEY, 0i64)));
            }
        }

        self.event_name = table.get(EVENT_NAME_KEY, String::new()).to_lowercase();
        self.current_name()
    }
}
