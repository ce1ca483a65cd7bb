//! Decoding options.

/// Options for decoding a workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Decode sheets concurrently (needs the `parallel` feature)
    pub parallel: bool,

    /// Drop empty cells and sheets from the result
    pub prune: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            prune: true,
        }
    }
}

impl DecodeOptions {
    /// Create new decode options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable per-sheet parallel decoding.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enable or disable pruning.
    ///
    /// Without pruning every decoded cell and every declared sheet is kept.
    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Whether sheets will actually be decoded concurrently.
    pub fn runs_parallel(&self) -> bool {
        cfg!(feature = "parallel") && self.parallel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = DecodeOptions::default();
        assert!(opts.parallel);
        assert!(opts.prune);
    }

    #[test]
    fn test_builder_pattern() {
        let opts = DecodeOptions::new().with_parallel(false).with_prune(false);
        assert!(!opts.parallel);
        assert!(!opts.prune);
        assert!(!opts.runs_parallel());
    }
}
