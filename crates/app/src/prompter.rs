//! Terminal permission prompter for the CLI host.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use tradeflow_search::{Permission, PermissionPrompter, PermissionStatus, PromptDecision};

/// Asks on stderr, reads the answer from stdin.
///
/// Answers last for the life of the process; a dismissed prompt is asked again.
#[derive(Debug, Default)]
pub struct ConsolePrompter {
    remembered: Mutex<HashMap<Permission, PermissionStatus>>,
    assume_yes: bool,
}

impl ConsolePrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant everything without asking (`--yes`).
    pub fn assume_yes() -> Self {
        Self {
            assume_yes: true,
            ..Self::default()
        }
    }

    fn remember(&self, permission: Permission, decision: PromptDecision) {
        let status = match decision {
            PromptDecision::Granted => PermissionStatus::Granted,
            PromptDecision::Denied => PermissionStatus::Denied,
            PromptDecision::Dismissed => return,
        };
        self.remembered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(permission, status);
    }
}

/// `y`/`yes` grants, `n`/`no` denies, anything else (including EOF) dismisses.
pub fn parse_answer(line: Option<&str>) -> PromptDecision {
    match line.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
        Some("y" | "yes") => PromptDecision::Granted,
        Some("n" | "no") => PromptDecision::Denied,
        _ => PromptDecision::Dismissed,
    }
}

fn ask(permission: Permission) -> Option<String> {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "Allow tradeflow to use the {permission}? [y/n] ");
    let _ = stderr.flush();

    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

#[async_trait]
impl PermissionPrompter for ConsolePrompter {
    async fn status(&self, permission: Permission) -> PermissionStatus {
        if self.assume_yes {
            return PermissionStatus::Granted;
        }
        self.remembered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&permission)
            .copied()
            .unwrap_or(PermissionStatus::Undetermined)
    }

    async fn request(&self, permission: Permission) -> PromptDecision {
        let line = match tokio::task::spawn_blocking(move || ask(permission)).await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "permission prompt aborted");
                None
            }
        };
        let decision = parse_answer(line.as_deref());
        self.remember(permission, decision);
        decision
    }
}
