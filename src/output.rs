//! Terminal output for the CLI: colored messages, the scan progress bar,
//! the attribute ranking table and the plan preview tree.

use crate::mover::RevertReport;
use crate::planner::PlanTree;
use crate::ranking::AttributeRanking;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Progress bar for metadata extraction; its length is set once the
    /// directory has been listed.
    pub fn create_progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb.set_message("reading metadata");
        pb
    }

    /// Prints the ranking as a numbered table, at most `limit` rows.
    pub fn ranking_table(ranking: &AttributeRanking, total_files: usize, limit: Option<usize>) {
        Self::header("ATTRIBUTES");

        let shown = limit.unwrap_or(ranking.len()).min(ranking.len());
        let rows = &ranking[..shown];
        let name_width = rows
            .iter()
            .map(|attr| attr.name.chars().count())
            .max()
            .unwrap_or(0)
            .max(9); // "Attribute"

        println!(
            "{:>4}  {:<width$} | {}",
            "#".bold(),
            "Attribute".bold(),
            "Files".bold(),
            width = name_width
        );
        println!("{}", "-".repeat(name_width + 18));

        for (idx, attr) in rows.iter().enumerate() {
            let count = format!("{}/{}", attr.count, total_files);
            let count = if attr.count == total_files {
                count.green()
            } else {
                count.normal()
            };
            println!(
                "{:>4}  {:<width$} | {}",
                idx + 1,
                attr.name,
                count,
                width = name_width
            );
        }

        if shown < ranking.len() {
            println!("  ... {} more", ranking.len() - shown);
        }
    }

    /// Prints the planned folder tree below `root_label`.
    pub fn plan_tree(root_label: &str, tree: &PlanTree) {
        println!("{}", root_label.bold());
        Self::print_tree_level(tree, "");
    }

    fn print_tree_level(tree: &PlanTree, indent: &str) {
        let total = tree.folders.len() + tree.files.len();
        let mut position = 0;

        for (name, child) in &tree.folders {
            position += 1;
            let last = position == total;
            println!(
                "{}{} {}/ ({})",
                indent,
                if last { "└──" } else { "├──" },
                name.blue().bold(),
                child.file_count()
            );
            let child_indent = format!("{}{}", indent, if last { "    " } else { "│   " });
            Self::print_tree_level(child, &child_indent);
        }

        for file in &tree.files {
            position += 1;
            let branch = if position == total { "└──" } else { "├──" };
            println!("{}{} {}", indent, branch, file);
        }
    }

    pub fn revert_report(report: &RevertReport) {
        Self::success(&format!("Restored: {}", report.restored));
        if report.removed_dirs > 0 {
            Self::info(&format!("Removed {} empty folder(s)", report.removed_dirs));
        }

        if !report.skipped.is_empty() {
            Self::warning(&format!("Skipped (no longer there): {}", report.skipped.len()));
            for path in &report.skipped {
                println!("    - {}", path.display());
            }
        }

        if !report.failed.is_empty() {
            Self::error(&format!("Failed: {}", report.failed.len()));
            for (path, reason) in &report.failed {
                eprintln!("    - {}: {}", path.display(), reason);
            }
        }
    }
}
