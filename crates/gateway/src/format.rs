//! Chat-friendly text renderings of survey data.

use std::fmt::Write;

use quotabot_purespectrum::{Quota, Survey};

const STATUS_BAR_WIDTH: usize = 15;
const QUOTA_BAR_WIDTH: usize = 20;

/// `[=====----------]`-style bar, clamped to `width`.
pub fn progress_bar(pct: f64, width: usize) -> String {
    let filled = ((width as f64 * pct / 100.0) as usize).min(width);
    format!("{}{}", "=".repeat(filled), "-".repeat(width - filled))
}

pub fn format_survey_status(survey: &Survey) -> String {
    let pct = survey.progress_pct();
    [
        format!("**Survey {} Status**", survey.id),
        format!("**Title:** {}", survey.title),
        format!("**Status:** {}", survey.status),
        format!(
            "**Progress:** {}/{} ({pct:.1}%)",
            survey.completes, survey.target
        ),
        format!(
            "**Progress Bar:** [{}]",
            progress_bar(pct, STATUS_BAR_WIDTH)
        ),
        format!("**CPI:** ${:.2}", survey.cpi),
        format!("**Incidence:** {:.1}%", survey.incidence * 100.0),
        format!("**LOI:** {} minutes", survey.loi),
        format!("**Current Cost:** ${:.2}", survey.current_cost),
        String::new(),
        format!("Use `quotas {}` for detailed quota breakdown", survey.id),
    ]
    .join("\n")
}

/// Quotas grouped by category, in first-seen group order.
pub fn format_quotas(survey_id: &str, quotas: &[Quota]) -> String {
    if quotas.is_empty() {
        return format!("No quota data available for survey {survey_id}");
    }

    let mut groups: Vec<(&str, Vec<&Quota>)> = Vec::new();
    for quota in quotas {
        match groups.iter_mut().find(|(name, _)| *name == quota.group()) {
            Some((_, members)) => members.push(quota),
            None => groups.push((quota.group(), vec![quota])),
        }
    }

    let mut out = format!("**Quota Details for Survey {survey_id}**\n\n");
    for (group, members) in &groups {
        let _ = writeln!(out, "**{group}**");
        for quota in members {
            let pct = quota.progress_pct();
            let _ = writeln!(out, "  • **{}**", quota.display_name());
            let _ = writeln!(
                out,
                "    Fielded: {}/{} ({pct:.1}%)",
                quota.achieved, quota.required_count
            );
            let _ = writeln!(
                out,
                "    Progress: [{}] {pct:.1}%",
                progress_bar(pct, QUOTA_BAR_WIDTH)
            );
            let _ = writeln!(
                out,
                "    Target: {} | Open: {} | In Progress: {}",
                quota.current_target.unwrap_or(quota.required_count),
                quota.currently_open,
                quota.in_progress
            );
        }
        out.push('\n');
    }

    if groups.len() > 1 {
        let fielded: u64 = quotas.iter().map(|q| q.achieved).sum();
        let goal: u64 = quotas.iter().map(|q| q.required_count).sum();
        let pct = if goal == 0 {
            0.0
        } else {
            fielded as f64 / goal as f64 * 100.0
        };
        let _ = writeln!(out, "**Overall Progress: {fielded}/{goal} ({pct:.1}%)**");
    }

    out.trim_end().to_string()
}

pub fn format_live_surveys(surveys: &[Survey]) -> String {
    if surveys.is_empty() {
        return "No active surveys found.".into();
    }
    let mut out = format!("**Found {} Active Surveys**\n\n", surveys.len());
    for survey in surveys {
        let pct = survey.progress_pct();
        let _ = writeln!(out, "**Survey ID:** {}", survey.id);
        let _ = writeln!(out, "**Title:** {}", survey.title);
        let _ = writeln!(out, "**Status:** {}", survey.status);
        let _ = writeln!(
            out,
            "**Progress:** {}/{} ({pct:.1}%)",
            survey.completes, survey.target
        );
        let _ = writeln!(out, "[{}] {pct:.1}%", progress_bar(pct, STATUS_BAR_WIDTH));
        let _ = writeln!(out, "**CPI:** ${:.2}", survey.cpi);
        out.push('\n');
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use {super::*, quotabot_purespectrum::Criterion};

    fn survey() -> Survey {
        Survey {
            id: "45104633".into(),
            title: "Grocery habits".into(),
            status: "Active".into(),
            completes: 50,
            target: 200,
            cpi: 2.5,
            loi: 12.0,
            incidence: 0.35,
            current_cost: 125.0,
            ..Default::default()
        }
    }

    fn quota(group: &str, gender: &str, achieved: u64, required: u64) -> Quota {
        Quota {
            group_key: Some(group.into()),
            achieved,
            required_count: required,
            criteria: vec![Criterion {
                qualification_name: "Gender".into(),
                condition_names: vec![gender.into()],
                range_sets: Vec::new(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn bars() {
        assert_eq!(progress_bar(0.0, 10), "----------");
        assert_eq!(progress_bar(50.0, 10), "=====-----");
        assert_eq!(progress_bar(250.0, 4), "====");
    }

    #[test]
    fn status_message() {
        let text = format_survey_status(&survey());
        assert!(text.starts_with("**Survey 45104633 Status**"));
        assert!(text.contains("**Progress:** 50/200 (25.0%)"));
        assert!(text.contains("**Progress Bar:** [===------------]"));
        assert!(text.contains("**CPI:** $2.50"));
        assert!(text.contains("**Incidence:** 35.0%"));
        assert!(text.contains("**LOI:** 12 minutes"));
        assert!(text.ends_with("Use `quotas 45104633` for detailed quota breakdown"));
    }

    #[test]
    fn quotas_grouped_with_summary() {
        let quotas = [
            quota("Gender", "Male", 10, 20),
            quota("Region", "Female", 5, 20),
            quota("Gender", "Female", 20, 20),
        ];
        let text = format_quotas("1", &quotas);
        let gender = text.find("**Gender**").unwrap();
        let region = text.find("**Region**").unwrap();
        assert!(gender < region);
        assert_eq!(text.matches("• **Female**").count(), 2);
        assert!(text.contains("Fielded: 10/20 (50.0%)"));
        assert!(text.contains("Target: 20 | Open: 0 | In Progress: 0"));
        assert!(text.ends_with("**Overall Progress: 35/60 (58.3%)**"));
    }

    #[test]
    fn single_group_has_no_summary() {
        let text = format_quotas("1", &[quota("Gender", "Male", 1, 2)]);
        assert!(!text.contains("Overall Progress"));
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(
            format_quotas("7", &[]),
            "No quota data available for survey 7"
        );
        assert_eq!(format_live_surveys(&[]), "No active surveys found.");
    }

    #[test]
    fn live_list() {
        let text = format_live_surveys(&[survey()]);
        assert!(text.starts_with("**Found 1 Active Surveys**"));
        assert!(text.contains("**Survey ID:** 45104633"));
        assert!(text.ends_with("**CPI:** $2.50"));
    }
}
