//! Terminal rendering of a health report

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use std::io::{self, Write};

use sentinel_core::{CheckStatus, HealthReport, OverallStatus, RemediationStatus};

/// Output format for the `run` command
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table with colors
    #[default]
    Table,
    /// Pretty JSON, identical to the HTTP response body
    Json,
}

/// Print a report in the requested format
pub fn render(report: &HealthReport, format: OutputFormat) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
            writeln!(stdout, "{}", json)
        }
        OutputFormat::Table => render_table(&mut stdout, report),
    }
}

fn render_table(out: &mut impl Write, report: &HealthReport) -> io::Result<()> {
    let s = &report.summary;

    writeln!(out)?;
    writeln!(out, "{}", "Platform Health".cyan().bold())?;
    writeln!(out, "{}", "=".repeat(72))?;
    writeln!(
        out,
        "{}  score {}  ({} passed, {} warnings, {} failures, {} healed)",
        overall_label(s.status),
        s.score.to_string().bold(),
        s.passed,
        s.warnings,
        s.failures,
        s.healed
    )?;
    writeln!(out, "Run {}  at {}", report.run_id.to_string().dimmed(), s.checked_at.to_rfc3339())?;
    writeln!(out)?;

    writeln!(out, "{}", "Checks:".cyan().bold())?;
    writeln!(out, "{}", "-".repeat(72))?;
    for check in &report.checks {
        let mut note = String::new();
        if check.is_healed() {
            note.push_str(" (healed)");
        }
        if let Some(reason) = check
            .details
            .get("error")
            .or_else(|| check.details.get("reason"))
            .and_then(|v| v.as_str())
        {
            note.push_str(&format!(" {}", reason));
        }
        writeln!(
            out,
            "{} {:<10} {:<28} {:>6} ms{}",
            check_icon(check.status),
            check.check_type.as_str(),
            check.check_name,
            check.response_time_ms,
            note.dimmed()
        )?;
    }

    if s.self_healing_enabled {
        writeln!(out)?;
        writeln!(
            out,
            "{} {} taken, {} succeeded",
            "Remediations:".cyan().bold(),
            s.remediations_taken,
            s.remediations_succeeded
        )?;
        for remediation in &report.remediations {
            writeln!(
                out,
                "  {:<10} {:<22} {}",
                remediation_label(remediation.status),
                remediation.issue,
                remediation.action
            )?;
        }
    } else {
        writeln!(out)?;
        writeln!(out, "{}", "Self-healing disabled".dimmed())?;
    }

    writeln!(out)?;
    writeln!(out, "Completed in {} ms", s.execution_time_ms.to_string().dimmed())?;
    out.flush()
}

fn overall_label(status: OverallStatus) -> ColoredString {
    match status {
        OverallStatus::Healthy => "HEALTHY".green().bold(),
        OverallStatus::Warning => "WARNING".yellow().bold(),
        OverallStatus::Degraded => "DEGRADED".red().bold(),
    }
}

fn check_icon(status: CheckStatus) -> ColoredString {
    match status {
        CheckStatus::Pass => "+".green(),
        CheckStatus::Warn => "!".yellow(),
        CheckStatus::Fail => "x".red(),
    }
}

fn remediation_label(status: RemediationStatus) -> ColoredString {
    match status {
        RemediationStatus::Success => status.as_str().green(),
        RemediationStatus::Triggered => status.as_str().blue(),
        RemediationStatus::Failed => status.as_str().red(),
        RemediationStatus::Skipped => status.as_str().dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sentinel_core::contracts::{issue, HealthCheck, ProbeResult, Remediation, Summary};
    use sentinel_core::CheckType;

    #[test]
    fn test_table_lists_checks_and_remediations() {
        colored::control::set_override(false);
        let now = Utc::now();
        let mut healed =
            HealthCheck::stamped(CheckType::Function, "fetch-bills", ProbeResult::pass(40), now);
        healed.details.insert("healed".into(), true.into());

        let report = HealthReport {
            run_id: Default::default(),
            summary: Summary {
                status: OverallStatus::Healthy,
                score: 100,
                total_checks: 1,
                passed: 1,
                warnings: 0,
                failures: 0,
                healed: 1,
                self_healing_enabled: true,
                remediations_taken: 1,
                remediations_succeeded: 1,
                execution_time_ms: 321,
                checked_at: now,
            },
            checks: vec![healed],
            remediations: vec![Remediation::new(
                issue::FUNCTION_UNHEALTHY,
                "retry_edge_function:fetch-bills",
                RemediationStatus::Success,
                now,
            )],
        };

        let mut buffer = Vec::new();
        render_table(&mut buffer, &report).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("HEALTHY"));
        assert!(text.contains("fetch-bills"));
        assert!(text.contains("(healed)"));
        assert!(text.contains("retry_edge_function:fetch-bills"));
        assert!(text.contains("Completed in 321 ms"));
    }
}
