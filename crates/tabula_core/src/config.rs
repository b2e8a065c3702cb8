//! Database configuration.

/// Configuration for creating and opening databases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether selecting an unknown database creates it.
    pub create_if_missing: bool,

    /// Whether the file backend fsyncs every document write.
    pub sync_writes: bool,

    /// Whether persisted documents are pretty-printed.
    pub pretty_documents: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_writes: true,
            pretty_documents: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create databases on first selection.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fsync document writes.
    #[must_use]
    pub const fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }

    /// Sets whether to pretty-print persisted documents.
    #[must_use]
    pub const fn pretty_documents(mut self, value: bool) -> Self {
        self.pretty_documents = value;
        self
    }
}
