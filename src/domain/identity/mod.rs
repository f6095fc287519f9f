//! Identity domain - read models of the auth tables and the admin listing rules.

mod errors;
mod listing;
mod records;

pub use errors::AdminError;
pub use listing::{
    total_pages, AccountCounts, AccountFilter, ExpiryCounts, ExpiryStatus, ListPage,
    PageRequest, SearchTerm, SessionFilter, TableCounts, UserCounts, UserFilter,
    VerificationFilter, PAGE_SIZE,
};
pub use records::{AccountRecord, Browser, SessionRecord, UserRecord, VerificationRecord};
