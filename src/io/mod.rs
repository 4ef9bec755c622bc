pub mod fs_host;
pub mod host;
pub mod lock;
pub mod memory_host;
pub mod recovery;
pub mod settings_io;
pub mod watcher;

pub use fs_host::FsNoteHost;
pub use host::{HostError, NoteHost, NoteSummary};
pub use memory_host::MemoryNoteHost;
