/// Constants used throughout the envmatrix codebase

// Configuration file
pub const CONFIG_FILENAME: &str = "tox.ini";
pub const GLOBAL_SECTION: &str = "tox";
pub const BASE_ENV_SECTION: &str = "testenv";
pub const ENV_SECTION_PREFIX: &str = "testenv:";
pub const DEFAULT_WORK_DIR: &str = ".tox";

// Environment variable names
pub const ENVMATRIX_LOG_VAR: &str = "ENVMATRIX_LOG";
pub const ENVMATRIX_CONFIG_VAR: &str = "ENVMATRIX_CONFIG";
pub const ENV_NAME_VAR: &str = "TOX_ENV_NAME";
pub const ENV_DIR_VAR: &str = "TOX_ENV_DIR";
pub const WORK_DIR_VAR: &str = "TOX_WORK_DIR";

/// Host variables handed to every command regardless of `passenv`
pub const DEFAULT_PASSENV: &[&str] = &[
    "PATH",
    "LANG",
    "LANGUAGE",
    "LD_LIBRARY_PATH",
    "PIP_INDEX_URL",
    "PIP_EXTRA_INDEX_URL",
    "HOME",
    "TMPDIR",
];

/// Maximum nesting of `{[section]key}` references
pub const MAX_SUBSTITUTION_DEPTH: usize = 16;
