use crate::error::LogError;
use crate::schemas::exchange::Exchange;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const HEADER: [&str; 3] = ["Timestamp", "User Message", "Bot Response"];

/// Append-only CSV record of every chat exchange.
///
/// Clones share one lock, so the header check and the row write happen as a single
/// critical section across all concurrent requests.
#[derive(Clone)]
pub struct ExchangeLog {
    path: Arc<Mutex<PathBuf>>,
}

impl ExchangeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(Mutex::new(path.into())),
        }
    }

    pub fn path(&self) -> PathBuf {
        match self.path.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub async fn append(&self, user_input: &str, bot_output: &str) -> Result<Exchange, LogError> {
        let path = Arc::clone(&self.path);
        let user_input = user_input.to_string();
        let bot_output = bot_output.to_string();

        let exchange = tokio::task::spawn_blocking(move || {
            let guard = path.lock().map_err(|_| LogError::Poisoned)?;
            // Stamped under the lock so rows land in timestamp order.
            let exchange = Exchange::new(&user_input, &bot_output);
            write_record(&guard, &exchange)?;
            Ok::<_, LogError>(exchange)
        })
        .await??;

        Ok(exchange)
    }
}

fn encode_rows(rows: &[[&str; 3]]) -> Result<Vec<u8>, LogError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| LogError::Io(e.into_error()))
}

fn write_record(path: &Path, exchange: &Exchange) -> Result<(), LogError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let bytes = if is_new {
        encode_rows(&[HEADER, exchange.as_record()])?
    } else {
        encode_rows(&[exchange.as_record()])?
    };

    file.write_all(&bytes)?;
    file.flush()?;
    Ok(())
}
