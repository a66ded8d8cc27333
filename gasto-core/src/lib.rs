//! gasto-core: domain types and date heuristics for the expense-capture core.

pub mod dates;
pub mod registry;
pub mod retry;
pub mod submission;

pub use dates::{ensure_valid_date, DateResolver};
pub use registry::{Card, Destination, User};
pub use retry::{plan_attempt, AttemptPlan, RetryPolicy, EXHAUSTED_MESSAGE};
pub use submission::{
    temp_id, AudioAttachment, ExpenseDraft, QueuedSubmission, RemoteAck, SubmitRequest,
    SubmissionStatus, TEMP_ID_PREFIX,
};
