use std::ffi::OsStr;
use std::path::PathBuf;

/// Resolve a CLI program name to a path on PATH.
/// Names containing a path separator are returned as given.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(program);
        return path.exists().then_some(path);
    }
    which::which(program).ok()
}

/// Format args for messages, quoting arguments that contain whitespace
pub fn format_args<S: AsRef<OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|s| {
            let s = s.as_ref().to_string_lossy().to_string();
            if s.is_empty() || s.chars().any(char::is_whitespace) {
                format!("'{}'", s)
            } else {
                s
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a flag is already present as `--flag` or `--flag=value`
pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| {
        a == flag
            || a.strip_prefix(flag)
                .is_some_and(|rest| rest.starts_with('='))
    })
}
