pub mod brand;
pub mod element_ids;
pub mod loaders;
pub mod marking;
pub mod question;

pub use brand::BrandIdentity;
pub use loaders::{load_question_set, parse_question_literal};
pub use marking::{MarkingScheme, NegativeMarking};
pub use question::{ExtractionStatus, QuestionSet, QuizQuestion};
