use anyhow::Result;
use colored::Colorize;
use geoquiz_game::{
    Achievements, OverallReport, PlayTime, RegionCategory, RegionEntry, Session,
    StatisticsService, StatsStore,
};
use serde::Serialize;
use std::io::Write;

use super::RunSummary;

/// Runs of this invocation plus a snapshot of the stored statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub runs: Vec<RunSummary>,
    pub overall: OverallReport,
    pub groups: Vec<RegionEntry>,
    pub districts: Vec<RegionEntry>,
    pub recent_sessions: Vec<Session>,
    pub achievements: Achievements,
    pub play_time: PlayTime,
    pub durable: bool,
}

pub fn build_report<S: StatsStore>(
    runs: Vec<RunSummary>,
    stats: &StatisticsService<S>,
    recent: usize,
) -> RunReport {
    RunReport {
        runs,
        overall: stats.overall_stats(),
        groups: stats.all_region_stats(RegionCategory::Group),
        districts: stats.all_region_stats(RegionCategory::District),
        recent_sessions: stats.recent_sessions(recent).to_vec(),
        achievements: stats.achievements().clone(),
        play_time: stats.play_time(),
        durable: stats.persistence().is_durable(),
    }
}

pub fn generate_console_report<W: Write + ?Sized>(
    writer: &mut W,
    report: &RunReport,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 GeoQuiz Statistics".bright_cyan().bold())?;
    writeln!(writer, "{}", "=====================".cyan())?;

    if !report.runs.is_empty() {
        for run in &report.runs {
            let accuracy = format!("{}%", run.accuracy_pct);
            let accuracy = if run.accuracy_pct >= 90 {
                accuracy.green()
            } else if run.accuracy_pct >= 50 {
                accuracy.yellow()
            } else {
                accuracy.red()
            };
            writeln!(
                writer,
                "{} {}/{} correct, accuracy {}, score {:.2}",
                run.label.bold(),
                run.correct,
                run.rounds,
                accuracy,
                run.score
            )?;
            if run.skipped > 0 {
                writeln!(writer, "   Skipped clicks: {}", run.skipped)?;
            }
            for group in &run.newly_mastered {
                writeln!(writer, "   🏆 Mastered {}", group.green())?;
            }
        }
        writeln!(writer)?;
    }

    let overall = &report.overall;
    writeln!(writer, "Attempts: {}", overall.stats.total_attempts)?;
    writeln!(
        writer,
        "Correct: {}",
        overall.stats.total_correct.to_string().green()
    )?;
    writeln!(writer, "Accuracy: {:.1}%", overall.accuracy)?;
    writeln!(
        writer,
        "Average precision: {:.3}",
        overall.average_precision
    )?;
    writeln!(
        writer,
        "Best precision: {:.3}",
        overall.stats.best_precision
    )?;
    writeln!(
        writer,
        "Best session accuracy: {:.1}%",
        overall.stats.best_accuracy
    )?;
    writeln!(writer, "Total score: {:.2}", overall.stats.total_score)?;
    writeln!(writer)?;

    write_console_buckets(writer, "Regions (kraje)", &report.groups)?;
    write_console_buckets(writer, "Districts (okresy)", &report.districts)?;

    writeln!(writer, "{}", "🏆 Achievements".bright_yellow().bold())?;
    writeln!(
        writer,
        "Perfect sessions: {}",
        report.achievements.perfect_sessions
    )?;
    writeln!(
        writer,
        "High-precision hits: {}",
        report.achievements.high_precision
    )?;
    if report.achievements.mastered_groups.is_empty() {
        writeln!(writer, "Mastered regions: none yet")?;
    } else {
        let mastered: Vec<&str> = report
            .achievements
            .mastered_groups
            .iter()
            .map(String::as_str)
            .collect();
        writeln!(writer, "Mastered regions: {}", mastered.join(", "))?;
    }
    writeln!(writer)?;

    writeln!(
        writer,
        "Playing since {} ({} days), {} sessions recorded",
        report.play_time.first_played.format("%Y-%m-%d"),
        report.play_time.days_since_first,
        report.play_time.total_sessions
    )?;
    if !report.durable {
        writeln!(
            writer,
            "{}",
            "⚠️  Statistics could not be saved; results are held in memory only".red()
        )?;
    }
    Ok(())
}

fn write_console_buckets<W: Write + ?Sized>(
    writer: &mut W,
    title: &str,
    entries: &[RegionEntry],
) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    writeln!(writer, "{}", title.bold())?;
    for entry in entries {
        writeln!(
            writer,
            "  {:28} {:>3}/{:<3} {:>5.1}%",
            entry.name, entry.stats.correct, entry.stats.attempts, entry.stats.accuracy
        )?;
    }
    writeln!(writer)?;
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(writer: &mut W, report: &RunReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    writer: &mut W,
    report: &RunReport,
) -> Result<()> {
    writeln!(writer, "# GeoQuiz Statistics\n")?;

    if !report.runs.is_empty() {
        writeln!(writer, "## Runs\n")?;
        writeln!(writer, "| Run | Rounds | Correct | Accuracy | Score |")?;
        writeln!(writer, "|-----|--------|---------|----------|-------|")?;
        for run in &report.runs {
            writeln!(
                writer,
                "| {} | {} | {} | {}% | {:.2} |",
                run.label, run.rounds, run.correct, run.accuracy_pct, run.score
            )?;
        }
        writeln!(writer)?;
    }

    let overall = &report.overall;
    writeln!(writer, "## Overall\n")?;
    writeln!(writer, "- **Attempts:** {}", overall.stats.total_attempts)?;
    writeln!(writer, "- **Correct:** {}", overall.stats.total_correct)?;
    writeln!(writer, "- **Accuracy:** {:.1}%", overall.accuracy)?;
    writeln!(
        writer,
        "- **Average precision:** {:.3}",
        overall.average_precision
    )?;
    writeln!(
        writer,
        "- **Best precision:** {:.3}",
        overall.stats.best_precision
    )?;
    writeln!(
        writer,
        "- **Best session accuracy:** {:.1}%",
        overall.stats.best_accuracy
    )?;
    writeln!(writer)?;

    write_markdown_buckets(writer, "Regions", &report.groups)?;
    write_markdown_buckets(writer, "Districts", &report.districts)?;

    writeln!(writer, "## Achievements\n")?;
    writeln!(
        writer,
        "- Perfect sessions: {}",
        report.achievements.perfect_sessions
    )?;
    writeln!(
        writer,
        "- High-precision hits: {}",
        report.achievements.high_precision
    )?;
    for group in &report.achievements.mastered_groups {
        writeln!(writer, "- Mastered: {group}")?;
    }

    if !report.recent_sessions.is_empty() {
        writeln!(writer, "\n## Recent sessions\n")?;
        writeln!(writer, "| Started | Filter | Attempts | Accuracy |")?;
        writeln!(writer, "|---------|--------|----------|----------|")?;
        for session in &report.recent_sessions {
            writeln!(
                writer,
                "| {} | {} | {} | {:.1}% |",
                session.start_time.format("%Y-%m-%d %H:%M"),
                session.filter,
                session.attempts,
                session.accuracy
            )?;
        }
    }
    Ok(())
}

fn write_markdown_buckets<W: Write + ?Sized>(
    writer: &mut W,
    title: &str,
    entries: &[RegionEntry],
) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    writeln!(writer, "## {title}\n")?;
    writeln!(writer, "| Name | Correct | Attempts | Accuracy |")?;
    writeln!(writer, "|------|---------|----------|----------|")?;
    for entry in entries {
        writeln!(
            writer,
            "| {} | {} | {} | {:.1}% |",
            entry.name, entry.stats.correct, entry.stats.attempts, entry.stats.accuracy
        )?;
    }
    writeln!(writer)?;
    Ok(())
}
