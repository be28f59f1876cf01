pub mod config;
pub mod orchestrator;
pub mod sandbox;

pub use config::GraderConfig;
pub use orchestrator::{Autograder, NoopObserver, RunObserver, normalize_output};
pub use sandbox::error::ExecError;
pub use sandbox::piston::PistonClient;
pub use sandbox::{ExecOutcome, ExecRequest, ExecutionService, ExitInfo};
