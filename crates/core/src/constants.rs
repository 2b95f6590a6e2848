//! Constants used throughout the Clerk core crate.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_RECORD_DATA_DIR: &str = "record_data";

/// Directory name for workflow records under the data directory.
pub const RECORDS_DIR_NAME: &str = "records";

/// Filename of the YAML document holding one record.
pub const RECORD_FILENAME: &str = "record.yaml";

/// Prefix of the uniquely named temporary files a record is written through.
pub const RECORD_TMP_PREFIX: &str = ".record.yaml.";

/// Advisory lock file held while a record is checked and replaced.
pub const RECORD_LOCK_FILENAME: &str = ".record.lock";
