//! Request extractors for caller identity and the cron secret.

pub mod caller;
pub mod cron;

pub use caller::{Caller, USER_ID_HEADER};
pub use cron::CronAuthorized;
