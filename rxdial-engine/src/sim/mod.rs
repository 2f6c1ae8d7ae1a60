//! Collaborators that run without radio hardware.
//!
//! The front end only records what it is asked to do. Filter design and the
//! spectrum branch are real rustradio work.

mod designer;
mod front_end;
mod graph;

pub use designer::RustradioDesigner;
pub use front_end::SimulatedFrontEnd;
pub use graph::{NULL_AUDIO_DEVICE, RustradioFlowGraph, SIM_TONE_HZ};
