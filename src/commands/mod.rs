/// Result structs for command output. Commands return these instead of printing
/// directly; main.rs formats them as human-readable text or JSON based on --json.
mod identity;
mod run;

pub use identity::*;
pub use run::*;
