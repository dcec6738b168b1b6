#![forbid(unsafe_code)]

pub mod attempt;
pub mod error;

pub use exam_core::Clock;

pub use error::AttemptError;

pub use attempt::{
    AttemptFlow, AttemptProgress, AttemptSession, FlowPhase, PaletteEntry, SubmitOutcome,
    TickOutcome, format_timer, palette, palette_label,
};
