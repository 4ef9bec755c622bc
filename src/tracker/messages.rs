use indexmap::IndexMap;
use serde::Serialize;

use crate::io::host::NoteSummary;
use crate::model::config::{AggregationLevel, DateRange, LogSortOrder, SummarySort};
use crate::model::entry::{CompletedTask, RunningTask};

/// Outbound message to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum PanelMessage {
    UpdateRunningTasks {
        tasks: IndexMap<String, RunningTask>,
    },
    UpdateCompletedTasks {
        tasks: Vec<CompletedTask>,
    },
    UpdateAutocompleteLists {
        tasks: Vec<String>,
        projects: Vec<String>,
    },
    UpdateLogNotes {
        notes: Vec<NoteSummary>,
    },
    UpdateSortOrder {
        #[serde(rename = "sortBy")]
        sort_by: SummarySort,
    },
    Error {
        message: String,
    },
}

impl PanelMessage {
    /// Encode for a JSON message channel
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Snapshot used to hydrate a freshly opened panel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    pub running_tasks: IndexMap<String, RunningTask>,
    pub completed_tasks: Vec<CompletedTask>,
    pub unique_tasks: Vec<String>,
    pub unique_projects: Vec<String>,
    pub log_notes: Vec<NoteSummary>,
    pub default_note_id: Option<String>,
    pub sort_by: SummarySort,
    pub log_sort_order: LogSortOrder,
    pub date_range: DateRange,
    pub aggregation_level: AggregationLevel,
}
