//! Relays child stdout/stderr line by line behind a colored name prefix,
//! docker-compose style.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;

const COLORS: &[&str] = &[
    "\x1b[36m", // cyan
    "\x1b[33m", // yellow
    "\x1b[32m", // green
    "\x1b[35m", // magenta
    "\x1b[34m", // blue
    "\x1b[91m", // bright red
    "\x1b[92m", // bright green
    "\x1b[93m", // bright yellow
    "\x1b[94m", // bright blue
    "\x1b[95m", // bright magenta
];
const RESET: &str = "\x1b[0m";

/// Build the `name │ ` prefix for the task at `index`, right-aligned to `width`.
pub fn prefix_for(name: &str, index: usize, width: usize) -> String {
    let color = COLORS[index % COLORS.len()];
    format!("{color}{name:>width$}{RESET} │ ")
}

/// Take the child's piped stdout/stderr and forward each line with `prefix`.
pub(crate) fn relay(child: &mut Child, prefix: &str) {
    if let Some(stdout) = child.stdout.take() {
        let prefix = prefix.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                println!("{prefix}{line}");
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        let prefix = prefix.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{prefix}{line}");
            }
        });
    }
}
