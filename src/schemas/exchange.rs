use chrono::{DateTime, Local};

pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// One logged (timestamp, user input, bot output) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub timestamp: String,
    pub user_input: String,
    pub bot_output: String,
}

impl Exchange {
    pub fn new(user_input: &str, bot_output: &str) -> Self {
        Self::at(Local::now(), user_input, bot_output)
    }

    pub fn at(when: DateTime<Local>, user_input: &str, bot_output: &str) -> Self {
        Exchange {
            timestamp: when.format(TIMESTAMP_FORMAT).to_string(),
            user_input: user_input.to_string(),
            bot_output: bot_output.to_string(),
        }
    }

    pub fn as_record(&self) -> [&str; 3] {
        [&self.timestamp, &self.user_input, &self.bot_output]
    }
}
