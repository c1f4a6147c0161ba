pub mod record_linker;

pub use record_linker::{link, LinkOutcome, RecordLinker};
