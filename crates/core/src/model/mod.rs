mod answer;
mod session;
mod stat;

pub use answer::{AnswerEvent, AnswerKind, QuestionMeta};
pub use session::Session;
pub use stat::{AggregateStat, accuracy_rate};
