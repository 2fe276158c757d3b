use std::fmt::Write;

use crate::models::WeeklySummary;

/// Projects below this compliance share get called out in the report.
const ATTENTION_THRESHOLD_PCT: f64 = 75.0;

pub fn build_weekly_report(summary: &WeeklySummary) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Standup Compliance Report");
    let _ = writeln!(
        output,
        "Window: {} to {} (inclusive)",
        summary.start_date, summary.end_date
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Per-Project Compliance");

    if summary.projects.is_empty() {
        let _ = writeln!(output, "No standup logs recorded in this window.");
    } else {
        for project in summary.projects.iter() {
            let _ = writeln!(
                output,
                "- {} ({}): {:.2}% compliance over {} days \
                 (happened {}, missed {}, cancelled {}, no data {}, errors {})",
                project.project_name,
                project.project_key,
                project.compliance_pct,
                project.total_days,
                project.happened_count,
                project.missed_count,
                project.cancelled_count,
                project.no_data_count,
                project.error_count,
            );
        }
    }

    let needs_attention: Vec<_> = summary
        .projects
        .iter()
        .filter(|p| p.compliance_pct < ATTENTION_THRESHOLD_PCT)
        .collect();

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");

    if needs_attention.is_empty() {
        let _ = writeln!(output, "All projects at or above {ATTENTION_THRESHOLD_PCT}%.");
    } else {
        for project in needs_attention {
            let _ = writeln!(
                output,
                "- {} ({}) at {:.2}%",
                project.project_name, project.project_key, project.compliance_pct
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::ProjectComplianceSummary;

    fn summary_with(pcts: &[(&str, f64)]) -> WeeklySummary {
        let start = NaiveDate::from_ymd_opt(2025, 11, 10).expect("valid date");
        let end = NaiveDate::from_ymd_opt(2025, 11, 14).expect("valid date");

        WeeklySummary {
            start_date: start,
            end_date: end,
            projects: pcts
                .iter()
                .enumerate()
                .map(|(idx, (key, pct))| ProjectComplianceSummary {
                    project_id: idx as i64 + 1,
                    project_key: key.to_string(),
                    project_name: format!("{key} Platform"),
                    start_date: start,
                    end_date: end,
                    total_days: 5,
                    happened_count: 3,
                    missed_count: 2,
                    cancelled_count: 0,
                    no_data_count: 0,
                    error_count: 0,
                    compliance_pct: *pct,
                })
                .collect(),
        }
    }

    #[test]
    fn lists_every_project_with_counts() {
        let report = build_weekly_report(&summary_with(&[("OCS", 80.0), ("VOICE_AI", 60.0)]));

        assert!(report.contains("# Standup Compliance Report"));
        assert!(report.contains("OCS Platform (OCS): 80.00% compliance over 5 days"));
        assert!(report.contains("VOICE_AI Platform (VOICE_AI): 60.00%"));
    }

    #[test]
    fn flags_projects_below_threshold() {
        let report = build_weekly_report(&summary_with(&[("OCS", 80.0), ("VOICE_AI", 60.0)]));

        assert!(report.contains("## Needs Attention"));
        assert!(report.contains("- VOICE_AI Platform (VOICE_AI) at 60.00%"));
        assert!(!report.contains("- OCS Platform (OCS) at 80.00%"));
    }

    #[test]
    fn empty_window_reads_cleanly() {
        let report = build_weekly_report(&summary_with(&[]));

        assert!(report.contains("No standup logs recorded in this window."));
        assert!(report.contains("All projects at or above 75%."));
    }
}
