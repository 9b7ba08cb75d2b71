pub mod book;
pub mod record;

pub use book::{LoanBook, SortColumn, SortOrder};
pub use record::{LoanRecord, LoanRow, TIMESTAMP_FORMAT};
