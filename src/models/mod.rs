pub mod academic;
pub mod credentials;
pub mod grade;
pub mod report;

pub use academic::AcademicInfo;
pub use credentials::{Credentials, StoredCredentials};
pub use grade::{NormalizedCourse, RawGradeRecord, Season, TermGroup};
pub use report::{CurrentStats, ScrapeReport};
