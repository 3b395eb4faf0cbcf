pub mod quiz_session;
pub mod scoring;

pub use quiz_session::{
    PersistenceScope, QuestionStatus, QuizSession, SessionPhase, SessionSnapshot, SubmitOutcome,
};
pub use scoring::{percentile_estimate, score, ScoreReport};
