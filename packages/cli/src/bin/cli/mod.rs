pub mod agents;
pub mod progress;

use colored::*;
use foundry_compiler::CompileError;

/// Print a failed command; compile errors get one line per offending entity
pub fn print_error(error: &anyhow::Error) {
    match error.downcast_ref::<CompileError>() {
        Some(CompileError::ReferentialIntegrity(issues)) => {
            eprintln!(
                "{} {} unresolved reference(s)",
                "Error:".red().bold(),
                issues.len()
            );
            for issue in issues {
                eprintln!("  {} {}", issue.path.yellow(), issue.message);
            }
        }
        Some(CompileError::SchemaViolation(err)) => {
            eprintln!("{} invalid request", "Error:".red().bold());
            for violation in &err.violations {
                eprintln!("  {} {}", violation.path.yellow(), violation.message);
            }
        }
        Some(err) => eprintln!("{} [{}] {}", "Error:".red().bold(), err.kind(), err),
        None => eprintln!("{} {:#}", "Error:".red().bold(), error),
    }
}
