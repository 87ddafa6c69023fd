pub mod auth;
pub mod domain;
pub mod parse;
pub mod ports;
pub mod research;

#[cfg(test)]
mod test_support;

pub use auth::AuthService;
pub use domain::{
    GeneratedResearch, RenderedDocument, ReportSection, ReportStatus, ReportSummary,
    ResearchReport, SourceReference, StatusView, User, UserCredentials,
};
pub use ports::{
    DatabaseService, PasswordService, PortError, PortResult, ReportRenderingService,
    ResearchGenerationService, TokenService,
};
pub use research::ReportService;
