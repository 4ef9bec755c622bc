use crate::model::entry::{LogLine, LogNote};

/// Serialize a log note back to its body text.
/// Unparseable lines and clean entries are emitted verbatim; dirty entries
/// are rebuilt from their fields.
pub fn serialize_log(note: &LogNote) -> String {
    let mut lines = Vec::with_capacity(note.lines.len() + 1);
    lines.push(note.header.clone());
    for line in &note.lines {
        match line {
            LogLine::Entry(entry) => lines.push(entry.to_line()),
            LogLine::Unparseable(raw) => lines.push(raw.clone()),
        }
    }
    lines.join("\n")
}
