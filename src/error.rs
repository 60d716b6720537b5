pub type TickerResult<T> = Result<T, TickerError>;

#[derive(thiserror::Error, Debug)]
pub enum TickerError {
    /// Malformed preset or schedule structures. The core state is left
    /// unchanged when this is returned; re-apply a corrected preset.
    #[error("validation error: {0}")]
    Validation(String),

    /// Tile geometry that cannot be expanded (zero module dimensions,
    /// direction incompatible with the port orientation).
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A selection named a content absent from the registry and no
    /// fallback was possible.
    #[error("content error: {0}")]
    Content(String),

    /// Encoder process unavailable, pipe write failure, or cancellation.
    #[error("export error: {0}")]
    Export(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TickerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn content(msg: impl Into<String>) -> Self {
        Self::Content(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            TickerError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            TickerError::geometry("x")
                .to_string()
                .contains("geometry error:")
        );
        assert!(
            TickerError::content("x")
                .to_string()
                .contains("content error:")
        );
        assert!(
            TickerError::export("x")
                .to_string()
                .contains("export error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = TickerError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
