use crate::model::entry::{LogEntry, LogLine, LogNote};
use crate::parse::header::{resolve_header, FieldIndices, HeaderError};
use crate::parse::time_codec::parse_epoch_ms;

/// Parse a log note body.
///
/// The first line is the header; every following line becomes either an
/// entry or an unparseable line. Lines are split on `\n` only, so a trailing
/// newline yields a final empty (unparseable) line and serialization can
/// reproduce the body exactly.
pub fn parse_log(body: &str) -> Result<LogNote, HeaderError> {
    let mut raw_lines = body.split('\n');
    let header = raw_lines.next().unwrap_or_default().to_string();
    let indices = resolve_header(&header)?;

    let lines = raw_lines.map(|line| parse_line(line, &indices)).collect();

    Ok(LogNote {
        header,
        indices,
        lines,
    })
}

/// Classify a single data line.
///
/// Rows with an empty start time, or with start/end values that are not
/// valid dates and times, are kept as unparseable.
pub fn parse_line(line: &str, indices: &FieldIndices) -> LogLine {
    let mut fields: Vec<String> = line.split(',').map(|f| f.trim().to_string()).collect();
    if fields.len() < indices.width {
        fields.resize(indices.width, String::new());
    }
    let get = |idx: usize| fields.get(idx).cloned().unwrap_or_default();

    let start_time = get(indices.start_time);
    if start_time.is_empty() {
        return LogLine::Unparseable(line.to_string());
    }
    let start_date = get(indices.start_date);
    let Some(start_ms) = parse_epoch_ms(&start_date, &start_time) else {
        return LogLine::Unparseable(line.to_string());
    };

    let end_time = non_empty(get(indices.end_time));
    let end_date = non_empty(get(indices.end_date));
    let end_ms = match &end_time {
        Some(time) => {
            let date = end_date.as_deref().unwrap_or_default();
            match parse_epoch_ms(date, time) {
                Some(ms) => Some(ms),
                None => return LogLine::Unparseable(line.to_string()),
            }
        }
        None => None,
    };

    let project = get(indices.project);
    let task = get(indices.task);
    let duration = non_empty(get(indices.duration));

    LogLine::Entry(LogEntry {
        project,
        task,
        start_date,
        start_time,
        end_date,
        end_time,
        duration,
        start_ms,
        end_ms,
        fields,
        source: line.to_string(),
        dirty: false,
    })
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entry::EntryKind;

    const SAMPLE: &str = "\
Project,Task,Start date,Start time,End date,End time,Duration
Acme,Design review,2024-01-03,09:00:00,2024-01-03,10:15:00,01:15:00
just a note
Acme,Design review,2024-01-04,09:00:00,,,
";

    #[test]
    fn classifies_lines() {
        let note = parse_log(SAMPLE).unwrap();
        assert_eq!(note.header, "Project,Task,Start date,Start time,End date,End time,Duration");
        assert_eq!(note.lines.len(), 4);

        let LogLine::Entry(first) = &note.lines[0] else {
            panic!("expected entry");
        };
        assert_eq!(first.kind(), EntryKind::Completed);
        assert_eq!(first.task, "Design review");
        assert_eq!(first.duration.as_deref(), Some("01:15:00"));
        assert_eq!(first.end_ms.unwrap() - first.start_ms, 75 * 60 * 1000);

        assert!(matches!(&note.lines[1], LogLine::Unparseable(l) if l == "just a note"));

        let LogLine::Entry(open) = &note.lines[2] else {
            panic!("expected entry");
        };
        assert_eq!(open.kind(), EntryKind::Open);
        assert!(open.end_date.is_none());

        // trailing newline
        assert!(matches!(&note.lines[3], LogLine::Unparseable(l) if l.is_empty()));
    }

    #[test]
    fn short_rows_pad_missing_columns() {
        let note = parse_log("Project,Task,Start date,Start time,End date,End time,Duration\nP,T,2024-01-03,09:00:00").unwrap();
        let entry = note.entries().next().unwrap();
        assert_eq!(entry.fields.len(), 7);
        assert_eq!(entry.kind(), EntryKind::Open);
    }

    #[test]
    fn garbage_start_is_unparseable() {
        let note = parse_log(
            "Project,Task,Start date,Start time,End date,End time,Duration\nP,T,someday,noon,,,",
        )
        .unwrap();
        assert!(matches!(note.lines[0], LogLine::Unparseable(_)));
    }

    #[test]
    fn garbage_end_is_unparseable() {
        let note = parse_log(
            "Project,Task,Start date,Start time,End date,End time,Duration\nP,T,2024-01-03,09:00:00,2024-01-03,later,",
        )
        .unwrap();
        assert!(matches!(note.lines[0], LogLine::Unparseable(_)));
    }

    #[test]
    fn resolves_reordered_columns() {
        let note = parse_log("Task,Duration,Project,End time,End date,Start time,Start date\nWrite,,Blog,,,08:30:00,2024-01-02").unwrap();
        let entry = note.entries().next().unwrap();
        assert_eq!(entry.task, "Write");
        assert_eq!(entry.project, "Blog");
        assert_eq!(entry.start_date, "2024-01-02");
        assert_eq!(entry.kind(), EntryKind::Open);
    }

    #[test]
    fn invalid_header_fails_whole_parse() {
        assert!(parse_log("Name,Start\nfoo,bar").is_err());
    }
}
