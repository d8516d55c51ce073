/// Print a success message with checkmark
pub fn success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an error message with X
pub fn error(msg: &str) {
    println!("  ✗ {}", msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print a skipped test line
pub fn skip(msg: &str) {
    println!("  - {}", msg);
}

/// Print a dimmed/secondary message
pub fn dim(msg: &str) {
    println!("  {}", msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg);
}

/// Print a group header for `describe`
pub fn section(title: &str) {
    println!();
    println!("{}", title);
    println!("{}", "─".repeat(title.chars().count().max(8)));
}

/// Print multi-line captured output indented under the current line
pub fn detail(label: &str, text: &str) {
    let text = text.trim_end();
    if text.is_empty() {
        return;
    }
    println!("      {}:", label);
    for line in text.lines() {
        println!("        {}", line);
    }
}
