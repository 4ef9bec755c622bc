//! End-to-end tests over a notes directory on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use timeslip::io::settings_io::{read_settings, set_default_note_id};
use timeslip::io::FsNoteHost;
use timeslip::tracker::{ManualClock, TaskManager, TrackerError};
use tokio::sync::mpsc::unbounded_channel;

const HEADER: &str = "Project,Task,Start date,Start time,End date,End time,Duration";

fn create_notes_dir(root: &Path) {
    fs::write(root.join("work.md"), "").unwrap();
    fs::write(root.join("recipes.md"), "eggs\n").unwrap();
    fs::write(
        root.join("notes.toml"),
        r#"[[notes]]
id = "work"
title = "Work hours"
tags = ["time-slip"]

[[notes]]
id = "recipes"
title = "Recipes"
tags = ["food"]
"#,
    )
    .unwrap();
    fs::write(root.join("timeslip.toml"), "# tracker settings\nenforce_sorting = true\n").unwrap();
}

#[tokio::test]
async fn tracks_time_in_a_note_file() {
    let tmp = TempDir::new().unwrap();
    create_notes_dir(tmp.path());

    let settings_path = tmp.path().join("timeslip.toml");
    set_default_note_id(&settings_path, Some("work")).unwrap();
    let settings = read_settings(&settings_path).unwrap();
    assert_eq!(settings.default_note_id.as_deref(), Some("work"));

    let host = Arc::new(FsNoteHost::new(tmp.path()));
    let clock = Arc::new(ManualClock::new(
        Local.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).earliest().unwrap(),
    ));
    let (tx, _panel) = unbounded_channel();
    let manager = TaskManager::new(host, clock.clone(), &settings, tx);

    manager.initialize().await.unwrap();
    assert_eq!(
        manager
            .log_notes()
            .await
            .iter()
            .map(|n| n.title.as_str())
            .collect::<Vec<_>>(),
        vec!["Work hours"]
    );

    manager.start_task("Write", "Blog").await.unwrap();
    clock.advance(chrono::Duration::minutes(45));
    assert_eq!(manager.stop_task("Write", "Blog").await.unwrap(), 45 * 60 * 1000);

    assert_eq!(
        fs::read_to_string(tmp.path().join("work.md")).unwrap(),
        format!("{HEADER}\nBlog,Write,2024-01-03,09:00:00,2024-01-03,09:45:00,00:45:00\n")
    );
    assert!(!tmp.path().join(".work.lock").exists());
    assert!(!tmp.path().join(".recovery.log").exists());
}

#[tokio::test]
async fn unknown_note_id_is_not_found() {
    let tmp = TempDir::new().unwrap();
    create_notes_dir(tmp.path());

    let host = Arc::new(FsNoteHost::new(tmp.path()));
    let clock = ManualClock::new(Local.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).earliest().unwrap());
    let (tx, _panel) = unbounded_channel();
    let manager = TaskManager::new(host, clock, &Default::default(), tx);

    let err = manager.set_note_id(Some("gone".into())).await.unwrap_err();
    assert!(matches!(err, TrackerError::NoteNotFound(_)));
    assert_eq!(manager.note_id().await.as_deref(), Some("gone"));
}
