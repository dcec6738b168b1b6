mod answers;
mod navigation;
mod progress;
mod session;
mod sync;
mod view;
mod workflow;

// Public API of the attempt subsystem.
pub use crate::error::AttemptError;
pub use progress::AttemptProgress;
pub use session::AttemptSession;
pub use view::{PaletteEntry, format_timer, palette, palette_label};
pub use workflow::{AttemptFlow, FlowPhase, SubmitOutcome, TickOutcome};
