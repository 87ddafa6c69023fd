pub mod db;
pub mod memory;
pub mod password;
pub mod pdf;
pub mod research_llm;
pub mod token;

pub use db::DbAdapter;
pub use memory::InMemoryDb;
pub use password::Argon2Hasher;
pub use pdf::PdfReportRenderer;
pub use research_llm::GeminiResearchAdapter;
pub use token::JwtTokenAdapter;
