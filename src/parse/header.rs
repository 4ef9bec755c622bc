/// The canonical header written into empty log notes
pub const DEFAULT_HEADER: &str = "Project,Task,Start date,Start time,End date,End time,Duration";

/// Column positions of the seven required fields, resolved from a header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIndices {
    pub project: usize,
    pub task: usize,
    pub start_date: usize,
    pub start_time: usize,
    pub end_date: usize,
    pub end_time: usize,
    pub duration: usize,
    /// Number of columns in the header, including unknown ones
    pub width: usize,
}

/// Error type for header resolution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("invalid header: missing required column(s) {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Resolve the header line into field indices.
///
/// Matching is exact after lower-casing and trimming each column, so column
/// order is free and extra columns are ignored.
pub fn resolve_header(line: &str) -> Result<FieldIndices, HeaderError> {
    let columns: Vec<String> = line
        .to_lowercase()
        .split(',')
        .map(|c| c.trim().to_string())
        .collect();

    let mut missing = Vec::new();
    let mut find = |name: &'static str| -> usize {
        match columns.iter().position(|c| c == name) {
            Some(idx) => idx,
            None => {
                missing.push(name);
                0
            }
        }
    };

    let indices = FieldIndices {
        project: find("project"),
        task: find("task"),
        start_date: find("start date"),
        start_time: find("start time"),
        end_date: find("end date"),
        end_time: find("end time"),
        duration: find("duration"),
        width: columns.len(),
    };

    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(HeaderError::MissingFields(missing))
    }
}
