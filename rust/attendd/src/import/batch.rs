use serde::Serialize;
use tracing::warn;

/// Only the first few row errors are returned to the caller; all of them go
/// to the log.
pub const MAX_REPORTED_ERRORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_number: usize,
    pub message: String,
}

/// Outcome of one bulk import. `rejected` rows failed validation and were
/// never sent to the store; `failed` rows were rejected by the store itself.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub rejected: usize,
    pub error_count: usize,
    pub errors: Vec<RowError>,
}

impl BatchReport {
    pub fn new(total: usize) -> Self {
        BatchReport {
            total,
            ..Default::default()
        }
    }

    fn push_error(&mut self, row_number: usize, message: String) {
        self.error_count += 1;
        if self.errors.len() < MAX_REPORTED_ERRORS {
            self.errors.push(RowError {
                row_number,
                message,
            });
        }
    }

    pub fn reject(&mut self, row_number: usize, message: impl Into<String>) {
        let message = message.into();
        warn!(row = row_number, %message, "import row rejected");
        self.rejected += 1;
        self.push_error(row_number, message);
    }

    pub fn fail(&mut self, row_number: usize, message: impl Into<String>) {
        let message = message.into();
        warn!(row = row_number, %message, "import row insert failed");
        self.failed += 1;
        self.push_error(row_number, message);
    }

    pub fn succeed(&mut self) {
        self.succeeded += 1;
    }
}
