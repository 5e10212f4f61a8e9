use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use globset::{GlobBuilder, GlobMatcher};
use tracing::level_filters::LevelFilter;

use crate::error::FindError;

/// Longest full path, in bytes, the walker will build before giving up on an
/// entry. Matches `PATH_MAX` on Linux.
pub const MAX_PATH_LEN: usize = 4096;

// ---------------------------------------------------------------------------
// LogLevel
// ---------------------------------------------------------------------------

/// Output verbosity, from most to least verbose.
///
/// `Normal` is the level matched paths are printed at, so `Error` and `Off`
/// silence match output as well as diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Trace,
    Verbose,
    #[default]
    Normal,
    Error,
    Off,
}

impl LogLevel {
    /// Whether a message emitted at `self` passes a sink configured at `system`.
    pub fn enabled_at(self, system: LogLevel) -> bool {
        self != LogLevel::Off && self >= system
    }

    /// The `tracing` filter equivalent to this level.
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace   => LevelFilter::TRACE,
            LogLevel::Verbose => LevelFilter::DEBUG,
            LogLevel::Normal  => LevelFilter::INFO,
            LogLevel::Error   => LevelFilter::ERROR,
            LogLevel::Off     => LevelFilter::OFF,
        }
    }
}

impl FromStr for LogLevel {
    type Err = FindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace"   => Ok(LogLevel::Trace),
            "verbose" => Ok(LogLevel::Verbose),
            "normal"  => Ok(LogLevel::Normal),
            "error"   => Ok(LogLevel::Error),
            "off"     => Ok(LogLevel::Off),
            other     => Err(FindError::InvalidLogLevel(other.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace   => "trace",
            LogLevel::Verbose => "verbose",
            LogLevel::Normal  => "normal",
            LogLevel::Error   => "error",
            LogLevel::Off     => "off",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// MatchSettings
// ---------------------------------------------------------------------------

/// User-facing match configuration, shared read-only by every traversal.
///
/// The glob is compiled once here. `*` and `?` never match `/`, so a pattern
/// is always tested against a base name, never a path.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pattern:      String,
    glob:         GlobMatcher,
    recursive:    bool,
    log_level:    LogLevel,
    max_path_len: usize,
}

impl MatchSettings {
    /// Compile `pattern` into a new set of settings.
    ///
    /// # Errors
    ///
    /// [`FindError::InvalidPattern`] if the pattern is empty or not a valid glob.
    pub fn new(pattern: impl Into<String>, recursive: bool, log_level: LogLevel) -> Result<Self, FindError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(FindError::InvalidPattern {
                pattern,
                reason: "pattern must be provided".into(),
            });
        }

        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| FindError::InvalidPattern {
                pattern: pattern.clone(),
                reason:  e.kind().to_string(),
            })?
            .compile_matcher();

        Ok(Self {
            pattern,
            glob,
            recursive,
            log_level,
            max_path_len: MAX_PATH_LEN,
        })
    }

    /// Override the longest path the walker will build.
    pub fn with_max_path_len(mut self, max: usize) -> Self {
        self.max_path_len = max;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn max_path_len(&self) -> usize {
        self.max_path_len
    }

    /// Test a base name against the pattern. Names that are not valid UTF-8
    /// are matched on their raw bytes.
    pub fn is_match(&self, name: impl AsRef<OsStr>) -> bool {
        self.glob.is_match(Path::new(name.as_ref()))
    }
}
