// Easy-apply automation: authenticate, discover recommended postings, apply
// to each. All progress is reported through `logs::LogHub`; the HTTP layer
// never sees a pipeline failure.

pub mod answers;
pub mod handlers;
pub mod pipeline;
pub mod selectors;
