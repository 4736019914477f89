use colored::{Color, Colorize};
use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

use crate::common::reporter::TaskReporter;

/// Display utilities for the CLI interface
#[derive(Debug, Clone, Copy)]
pub struct DisplayHelper {
    pub use_color: bool,
}

impl DisplayHelper {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    /// Color when stdout is a terminal and `NO_COLOR` is unset
    pub fn auto(no_color: bool) -> Self {
        let use_color =
            !no_color && Term::stdout().is_term() && std::env::var("NO_COLOR").is_err();
        Self::new(use_color)
    }

    pub fn success(&self, message: &str) {
        self.print_status(StatusType::Success, message);
    }

    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "✗".red().bold(), message);
        } else {
            eprintln!("[ERROR] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        self.print_status(StatusType::Warning, message);
    }

    pub fn info(&self, message: &str) {
        self.print_status(StatusType::Info, message);
    }

    pub fn section_header(&self, title: &str) {
        if self.use_color {
            println!("\n{}", title.bold().underline());
        } else {
            println!("\n=== {} ===", title);
        }
    }

    pub fn format_path(&self, path: &str) -> String {
        if self.use_color {
            path.cyan().to_string()
        } else {
            format!("'{}'", path)
        }
    }

    pub fn format_version(&self, version: &str) -> String {
        if self.use_color {
            version.green().to_string()
        } else {
            version.to_string()
        }
    }

    pub fn format_package(&self, name: &str) -> String {
        if self.use_color {
            name.cyan().bold().to_string()
        } else {
            name.to_string()
        }
    }

    pub fn print_status(&self, status: StatusType, message: &str) {
        let (icon, color) = match status {
            StatusType::Success => ("✓", Color::Green),
            StatusType::Warning => ("⚠", Color::Yellow),
            StatusType::Info => ("::", Color::Blue),
            StatusType::Working => ("→", Color::Cyan),
        };

        if self.use_color {
            println!("{} {}", icon.color(color).bold(), message);
        } else {
            let label = match status {
                StatusType::Success => "[OK]",
                StatusType::Warning => "[WARN]",
                StatusType::Info => "[INFO]",
                StatusType::Working => "[WORK]",
            };
            println!("{} {}", label, message);
        }
    }

    pub fn print_indented(&self, message: &str, level: usize) {
        let indent = "  ".repeat(level);
        for line in message.lines() {
            println!("{}{}", indent, line);
        }
    }

    /// Create a spinner for indeterminate operations
    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.use_color {
            return ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
        }

        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_strings(&["⠁", "⠂", "⠄", "⡀", "⢀", "⠠", "⠐", "⠈"])
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

/// Status types for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusType {
    Success,
    Warning,
    Info,
    Working,
}

/// Task reporter drawing one spinner per task
pub struct SpinnerReporter {
    display: DisplayHelper,
    task: Mutex<Option<(String, ProgressBar)>>,
}

impl SpinnerReporter {
    pub fn new(display: DisplayHelper) -> Self {
        Self {
            display,
            task: Mutex::new(None),
        }
    }
}

impl TaskReporter for SpinnerReporter {
    fn start(&self, name: &str) {
        tracing::debug!(task = name, "started");
        if let Ok(mut task) = self.task.lock() {
            if let Some((_, previous)) = task.take() {
                previous.finish_and_clear();
            }
            *task = Some((name.to_string(), self.display.create_spinner(name)));
        }
    }

    fn update(&self, status: &str) {
        if let Ok(task) = self.task.lock() {
            if let Some((name, bar)) = task.as_ref() {
                bar.set_message(format!("{}: {}", name, status));
            }
        }
    }

    fn end(&self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some((_, bar)) = task.take() {
                bar.finish_and_clear();
            }
        }
    }
}
