//! Cleanup registry for resources created during a run
//!
//! Entries form a stack: the most recently created (and most dependent)
//! resource is deleted first. Every entry gets exactly one delete attempt.

use crate::invoke::{to_args, Invoke};
use crate::util::ui;
use anyhow::Result;

/// A created resource slated for deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupEntry {
    /// Resource kind as the CLI names it (e.g. `brokers`)
    pub kind: String,
    pub id: String,
}

impl CleanupEntry {
    /// `do <kind> delete <id> <confirm>`
    pub fn delete_args(&self, confirm_flag: &str) -> Vec<String> {
        let mut args = to_args(&["do", self.kind.as_str(), "delete", self.id.as_str()]);
        if !confirm_flag.is_empty() {
            args.push(confirm_flag.to_string());
        }
        args
    }
}

impl std::fmt::Display for CleanupEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Custom teardown for resources the CLI cannot delete
struct CleanupHook {
    label: String,
    action: Box<dyn FnOnce() -> Result<()>>,
}

/// What a cleanup pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub attempted: usize,
    pub deleted: usize,
    /// Entry (or hook label) and the reason it failed
    pub failures: Vec<(String, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
pub struct CleanupRegistry {
    entries: Vec<CleanupEntry>,
    hooks: Vec<CleanupHook>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an entry. Placeholder IDs and duplicates are refused with a
    /// warning so that nothing is deleted twice or by a bogus ID.
    pub fn register(&mut self, kind: &str, id: &str) -> bool {
        let id = id.trim();
        if kind.trim().is_empty() || is_placeholder_id(id) {
            ui::warn(&format!(
                "Not registering cleanup for {}/{}: no real ID",
                kind,
                if id.is_empty() { "<empty>" } else { id }
            ));
            return false;
        }

        let entry = CleanupEntry {
            kind: kind.trim().to_string(),
            id: id.to_string(),
        };
        if self.entries.contains(&entry) {
            ui::warn(&format!("Cleanup for {} already registered", entry));
            return false;
        }

        self.entries.push(entry);
        true
    }

    /// Register a custom teardown. Hooks run before the shared stack.
    pub fn add_hook<F>(&mut self, label: &str, action: F)
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        self.hooks.push(CleanupHook {
            label: label.to_string(),
            action: Box::new(action),
        });
    }

    /// Pending entries in registration order
    pub fn entries(&self) -> &[CleanupEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.hooks.is_empty()
    }

    /// Drain hooks, then entries in reverse registration order, issuing one
    /// best-effort delete per entry. Failures are logged and never stop the
    /// pass. A second call finds nothing left to do.
    pub fn run(&mut self, invoker: &mut dyn Invoke, confirm_flag: &str) -> CleanupReport {
        let mut report = CleanupReport::default();

        while let Some(hook) = self.hooks.pop() {
            report.attempted += 1;
            match (hook.action)() {
                Ok(()) => {
                    report.deleted += 1;
                    ui::dim(&format!("Cleaned up {}", hook.label));
                }
                Err(e) => {
                    ui::warn(&format!("Cleanup hook {} failed: {:#}", hook.label, e));
                    report.failures.push((hook.label, format!("{:#}", e)));
                }
            }
        }

        while let Some(entry) = self.entries.pop() {
            report.attempted += 1;
            match invoker.invoke(&entry.delete_args(confirm_flag)) {
                Ok(inv) if inv.success() => {
                    report.deleted += 1;
                    ui::dim(&format!("Deleted {}", entry));
                }
                Ok(inv) => {
                    let reason = first_line(&inv.stderr)
                        .or_else(|| first_line(&inv.stdout))
                        .unwrap_or_else(|| format!("exit {}", inv.exit_code));
                    ui::warn(&format!("Failed to delete {}: {}", entry, reason));
                    report.failures.push((entry.to_string(), reason));
                }
                Err(e) => {
                    ui::warn(&format!("Failed to delete {}: {:#}", entry, e));
                    report.failures.push((entry.to_string(), format!("{:#}", e)));
                }
            }
        }

        report
    }
}

/// IDs that mean "nothing was created": empty, JSON null, or an
/// unexpanded template/shell placeholder
pub fn is_placeholder_id(id: &str) -> bool {
    let id = id.trim();
    id.is_empty()
        || id.eq_ignore_ascii_case("null")
        || id.eq_ignore_ascii_case("none")
        || (id.starts_with('<') && id.ends_with('>'))
        || (id.starts_with("{{") && id.ends_with("}}"))
        || id.starts_with('$')
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
