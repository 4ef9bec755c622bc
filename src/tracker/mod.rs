pub mod clock;
pub mod debounce;
pub mod error;
pub mod messages;
pub mod note_writer;
pub mod task_manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::spawn_change_listener;
pub use error::TrackerError;
pub use messages::{InitialData, PanelMessage};
pub use task_manager::{ScanOutcome, ScanPhase, TaskManager};
