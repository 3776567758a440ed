//! A driver that records the statements it receives instead of running them.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use query_engine_execution::{Driver, Error};
use query_engine_metadata::metadata::Row;
use query_engine_sql::sql::string::SQL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Select,
    Update,
    Delete,
}

/// A statement sent to the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub statement: Statement,
    pub query: SQL,
}

/// Answers selects with queued row sets (no rows once the queue is empty) and updates and
/// deletes with a fixed affected row count.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    calls: Mutex<Vec<Call>>,
    responses: Mutex<VecDeque<Vec<Row>>>,
    affected_rows: u64,
}

impl RecordingDriver {
    pub fn new() -> RecordingDriver {
        RecordingDriver::default()
    }

    /// Queue the rows returned by the next select.
    #[must_use]
    pub fn with_rows(self, rows: Vec<Row>) -> RecordingDriver {
        self.push_rows(rows);
        self
    }

    #[must_use]
    pub fn with_affected_rows(mut self, affected_rows: u64) -> RecordingDriver {
        self.affected_rows = affected_rows;
        self
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.responses.lock().unwrap().push_back(rows);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// The SQL text of every call, in order.
    pub fn queries(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| call.query.sql)
            .collect()
    }

    fn record(&self, statement: Statement, query: &SQL) {
        self.calls.lock().unwrap().push(Call {
            statement,
            query: query.clone(),
        });
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn select(&self, query: &SQL) -> Result<Vec<Row>, Error> {
        self.record(Statement::Select, query);
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn update(&self, query: &SQL) -> Result<u64, Error> {
        self.record(Statement::Update, query);
        Ok(self.affected_rows)
    }

    async fn delete(&self, query: &SQL) -> Result<u64, Error> {
        self.record(Statement::Delete, query);
        Ok(self.affected_rows)
    }
}
