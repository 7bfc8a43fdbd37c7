//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and the repository. Each service
//! focuses on one part of the reconciliation workflow.

mod account;
mod doctor;
pub mod import;
pub mod logging;
pub mod migration;
mod reconcile;
mod record;
mod status;
pub mod suggest;

pub use account::{AccountService, NewAccount};
pub use doctor::{CheckResult, CheckStatus, DoctorResult, DoctorService, DoctorSummary};
pub use import::{ImportResult, ImportService, LinePreview};
pub use logging::{events, EntryPoint, EventCount, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use reconcile::{
    plan_matches, AutoFailure, AutoMatch, AutoReconcileResult, IgnoreOutcome, MatchPass,
    ReconcileOutcome, ReconcileService, DEFAULT_IGNORE_REASON,
};
pub use record::{NewRecord, RecordService};
pub use status::{ReconciliationSummary, StatusService};
pub use suggest::{MatchService, RankedCandidate, Suggestion};
