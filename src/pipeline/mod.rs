//! The six-stage conversational pipeline and the messages that flow between
//! its stages.

pub mod assembler;
pub mod coordinator;
pub mod messages;
pub mod preroll;

pub use coordinator::Coordinator;
pub use messages::PipelineMode;
