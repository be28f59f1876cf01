pub mod config;
pub mod error;
pub mod fence;
pub mod gate;
pub mod lifecycle;
pub mod ranking;
pub mod record;
pub mod repository;
pub mod stats;
pub mod topic;
pub mod workflow;

pub use config::{AppConfig, EngineConfig, LanguageSetConfig};
pub use error::{EngineError, GateError, ValidationError};
pub use gate::Operation;
pub use lifecycle::EventLifecycleController;
pub use record::{NewParticipation, ParticipationEntry};
pub use repository::ParticipationRepository;
pub use stats::{StatsReporter, StatsRequest};
pub use topic::{TopicParseError, TopicPatch, TopicStateStore};
pub use workflow::{
    CancelOutcome, CancelRequest, SubmissionWorkflow, SubmitOutcome, SubmitRequest,
    render_suite_report,
};
