use crate::pipeline::Stage;
use colored::Colorize;

/// Plain line-oriented progress for build job logs
pub struct BuildProgress;

impl BuildProgress {
    pub fn started(stage: Stage) {
        println!("{} {}", "→".blue(), stage.to_string().bold());
    }

    pub fn succeeded(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn degraded(message: &str) {
        println!("{} {}", "⚠".yellow(), message.yellow());
    }

    pub fn failed(stage: Stage, error: &str) {
        println!("{} {} failed: {}", "✗".red(), stage, error);
    }
}
