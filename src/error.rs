//! Error taxonomy for the funnel engine
//!
//! Contract violations (schema, state, unknown method) are returned to the
//! caller. Soft conditions such as an unmapped terminal, a zero denominator
//! or an unparsable timestamp never surface here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FunnelError {
    #[error("Table '{table}' is missing required column '{column}'")]
    Schema { table: String, column: String },

    #[error("{indicator} has no count result; call count() before rate()")]
    State { indicator: &'static str },

    #[error("Unsupported method: {method}")]
    UnsupportedMethod { method: String },

    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error(transparent)]
    Config(#[from] anyhow::Error),
}

impl FunnelError {
    pub fn schema(table: &str, column: &str) -> Self {
        Self::Schema { table: table.to_string(), column: column.to_string() }
    }
}

pub type FunnelResult<T> = Result<T, FunnelError>;
