use indexmap::IndexMap;
use serde::Serialize;

use crate::model::config::{AggregationLevel, SummarySort};
use crate::model::entry::CompletedTask;

/// One row of the completed-task summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    /// Task name, project name, or `Total` depending on the level
    pub name: String,
    /// Project of the row; set at task level only
    pub project: Option<String>,
    pub duration: i64,
    pub end_time: i64,
    /// Share of the summed duration across all rows, 0.0 to 100.0
    pub percentage: f64,
}

/// Sort completed aggregates in place
pub fn sort_completed(tasks: &mut [CompletedTask], by: SummarySort) {
    match by {
        SummarySort::Duration => tasks.sort_by(|a, b| b.duration.cmp(&a.duration)),
        SummarySort::EndTime => tasks.sort_by(|a, b| b.end_time.cmp(&a.end_time)),
        SummarySort::Name => tasks.sort_by(|a, b| {
            let a_name = format!("{} {}", a.project, a.task_name).to_lowercase();
            let b_name = format!("{} {}", b.project, b.task_name).to_lowercase();
            a_name.cmp(&b_name)
        }),
    }
}

/// Roll completed aggregates up to `level`, keep those matching `filter`
/// (case-insensitive substring of task or project), and sort by `by`.
pub fn summarize(
    tasks: &[CompletedTask],
    level: AggregationLevel,
    by: SummarySort,
    filter: &str,
) -> Vec<SummaryRow> {
    let needle = filter.trim().to_lowercase();
    let matching = tasks.iter().filter(|t| {
        needle.is_empty()
            || t.task_name.to_lowercase().contains(&needle)
            || t.project.to_lowercase().contains(&needle)
    });

    let mut rows: Vec<SummaryRow> = match level {
        AggregationLevel::Task => matching
            .map(|t| SummaryRow {
                name: t.task_name.clone(),
                project: Some(t.project.clone()),
                duration: t.duration,
                end_time: t.end_time,
                percentage: 0.0,
            })
            .collect(),
        AggregationLevel::Project | AggregationLevel::Note => {
            let mut groups: IndexMap<String, SummaryRow> = IndexMap::new();
            for t in matching {
                let name = match level {
                    AggregationLevel::Project => t.project.clone(),
                    _ => "Total".to_string(),
                };
                let row = groups.entry(name.clone()).or_insert_with(|| SummaryRow {
                    name,
                    project: None,
                    duration: 0,
                    end_time: 0,
                    percentage: 0.0,
                });
                row.duration += t.duration;
                row.end_time = row.end_time.max(t.end_time);
            }
            groups.into_values().collect()
        }
    };

    match by {
        SummarySort::Duration => rows.sort_by(|a, b| b.duration.cmp(&a.duration)),
        SummarySort::EndTime => rows.sort_by(|a, b| b.end_time.cmp(&a.end_time)),
        SummarySort::Name => rows.sort_by_key(|r| {
            let label = match &r.project {
                Some(project) => format!("{} {}", project, r.name),
                None => r.name.clone(),
            };
            label.to_lowercase()
        }),
    }

    let total: i64 = rows.iter().map(|r| r.duration).sum();
    if total > 0 {
        for row in &mut rows {
            row.percentage = row.duration as f64 * 100.0 / total as f64;
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str, project: &str, duration: i64, end_time: i64) -> CompletedTask {
        CompletedTask {
            task_name: name.into(),
            project: project.into(),
            duration,
            start_time: 0,
            end_time,
        }
    }

    fn sample() -> Vec<CompletedTask> {
        vec![
            task("Design", "Acme", 3_000, 30),
            task("Write", "Blog", 1_000, 50),
            task("Review", "Acme", 4_000, 10),
        ]
    }

    #[test]
    fn task_level_sorted_by_duration() {
        let rows = summarize(&sample(), AggregationLevel::Task, SummarySort::Duration, "");
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Review", "Design", "Write"]);
        assert_eq!(rows[0].project.as_deref(), Some("Acme"));
        assert!((rows[0].percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn project_level_sums_durations() {
        let rows = summarize(&sample(), AggregationLevel::Project, SummarySort::EndTime, "");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Blog");
        assert_eq!(rows[1].name, "Acme");
        assert_eq!(rows[1].duration, 7_000);
        assert_eq!(rows[1].end_time, 30);
    }

    #[test]
    fn note_level_is_a_single_total() {
        let rows = summarize(&sample(), AggregationLevel::Note, SummarySort::Name, "");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Total");
        assert_eq!(rows[0].duration, 8_000);
        assert!((rows[0].percentage - 100.0).abs() < 1e-9);
    }

    #[test]
    fn filter_matches_task_or_project() {
        let rows = summarize(&sample(), AggregationLevel::Task, SummarySort::Name, "acm");
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Design", "Review"]);

        let rows = summarize(&sample(), AggregationLevel::Task, SummarySort::Name, "WRI");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn empty_input_has_no_rows() {
        assert!(summarize(&[], AggregationLevel::Project, SummarySort::Duration, "").is_empty());
    }

    #[test]
    fn sort_completed_by_name_uses_project_then_task() {
        let mut tasks = sample();
        sort_completed(&mut tasks, SummarySort::Name);
        let names: Vec<_> = tasks.iter().map(|t| t.task_name.as_str()).collect();
        assert_eq!(names, vec!["Design", "Review", "Write"]);
    }
}
