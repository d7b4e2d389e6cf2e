//! Interactive confirmations
//!
//! The upload pipeline never asks questions itself; when the network check
//! fails the CLI consults a [`ConnectivityDecision`] instead.

use std::io::{self, Write};

use crate::app::ConnectivityReport;

/// Decides whether to go on after a failed network check
pub trait ConnectivityDecision {
    fn proceed(&self, report: &ConnectivityReport) -> bool;
}

/// Always proceeds (`--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl ConnectivityDecision for AssumeYes {
    fn proceed(&self, report: &ConnectivityReport) -> bool {
        tracing::warn!(
            "Continuing despite {} failed network check(s)",
            report.failures().count()
        );
        true
    }
}

/// Asks on the terminal, defaulting to no
#[derive(Debug, Clone, Copy, Default)]
pub struct AskUser;

impl ConnectivityDecision for AskUser {
    fn proceed(&self, report: &ConnectivityReport) -> bool {
        println!("⚠️  Network check failed for:");
        for check in report.failures() {
            match (&check.error, check.status) {
                (Some(error), _) => println!("   {} ({})", check.url, error),
                (None, Some(status)) => println!("   {} (status {})", check.url, status),
                (None, None) => println!("   {}", check.url),
            }
        }

        confirm("Continue anyway?", false).unwrap_or(false)
    }
}

/// Ask a yes/no question on stdout
pub fn confirm(question: &str, default: bool) -> io::Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{} {}: ", question, hint);
    io::stdout().flush()?;

    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(parse_answer(&response, default))
}

/// Interpret a yes/no answer; anything unrecognised gives `default`
pub fn parse_answer(input: &str, default: bool) -> bool {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y\n", false));
        assert!(parse_answer(" YES ", false));
        assert!(!parse_answer("n", true));
        assert!(!parse_answer("\n", false));
        assert!(parse_answer("", true));
        assert!(!parse_answer("maybe", false));
    }

    #[test]
    fn test_assume_yes_proceeds() {
        let report = ConnectivityReport { checks: Vec::new() };
        assert!(AssumeYes.proceed(&report));
    }
}
