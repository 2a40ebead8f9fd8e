pub mod assistant_report;
pub mod chat_report;
pub mod questions;
pub mod utils;

pub use assistant_report::AssistantReportGenerator;
pub use chat_report::ChatReportGenerator;
pub use questions::OpenRouterQuestionGenerator;
