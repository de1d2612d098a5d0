//! Domain error types.

/// Top-level error type for indexevent.
#[derive(Debug, thiserror::Error)]
pub enum IndexEventError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data load error: {reason}")]
    DataLoad { reason: String },

    #[error("no data: {reason}")]
    NoData { reason: String },

    #[error("execution error on {instrument}: {reason}")]
    Execution { instrument: String, reason: String },

    #[error("position cleanup failed after {dispatched} of {total} close commands: {source}")]
    Cleanup {
        dispatched: usize,
        total: usize,
        #[source]
        source: Box<IndexEventError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IndexEventError {
    pub fn data_load(reason: impl Into<String>) -> Self {
        IndexEventError::DataLoad {
            reason: reason.into(),
        }
    }
}

impl From<&IndexEventError> for std::process::ExitCode {
    fn from(err: &IndexEventError) -> Self {
        let code: u8 = match err {
            IndexEventError::Io(_) => 1,
            IndexEventError::ConfigParse { .. }
            | IndexEventError::ConfigMissing { .. }
            | IndexEventError::ConfigInvalid { .. } => 2,
            IndexEventError::DataLoad { .. } => 3,
            IndexEventError::Execution { .. } => 4,
            IndexEventError::NoData { .. } => 5,
            IndexEventError::Cleanup { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn cleanup_error_keeps_source() {
        let err = IndexEventError::Cleanup {
            dispatched: 1,
            total: 3,
            source: Box::new(IndexEventError::Execution {
                instrument: "MSFT.SIM".into(),
                reason: "venue rejected close".into(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("after 1 of 3"));
        assert!(msg.contains("venue rejected close"));
        assert!(err.source().is_some());
    }

    #[test]
    fn data_load_helper() {
        let err = IndexEventError::data_load("missing column Ticker");
        assert!(matches!(
            err,
            IndexEventError::DataLoad { ref reason } if reason == "missing column Ticker"
        ));
        assert_eq!(err.to_string(), "data load error: missing column Ticker");
    }
}
