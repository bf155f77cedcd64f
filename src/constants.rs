//! Common constants used throughout proyo.

/// Character that opens and closes the name of a control file (`_proyo_`).
pub const CONTROL_MARKER: char = '_';

/// Scope binding holding the owning node's directory.
pub const FOLDER_VAR: &str = "folder";

/// Scope binding holding the owning node itself.
pub const NODE_VAR: &str = "proyo";

/// Scope binding that accumulates generated lines while a file is rendered.
pub const LINES_VAR: &str = "_lines";

/// Separator line between the chunks of a control file (`# ~~~`).
pub const CHUNK_SEPARATOR: &str = r"(?m)^\s*#\s*~{3,}.*";

/// Control line inside a regular template file (`# ~ if x:`).
pub const CONTROL_LINE: &str = r"^\s*#\s*~(.*)$";

/// Default placeholder syntax, `{{expr}}`.
pub const DEFAULT_VAR_REGEX: &str = r"\{\{(.*?)\}\}";

/// proyo's ignore file name
pub const IGNORE_FILE: &str = ".proyoignore";

/// Patterns that are always ignored when walking a template.
pub const DEFAULT_IGNORE_PATTERNS: [&str; 4] = [IGNORE_FILE, ".git", ".git/**", "**/.DS_Store"];

/// Variable holding the absolute output directory.
pub const PROJECT_FOLDER_VAR: &str = "project_folder";
