pub mod alert;
pub mod scan_report;
pub mod subscription;
pub mod user;

pub use alert::{Alert, AlertPatch, Direction};
pub use scan_report::ScanReport;
pub use subscription::{PushSubscription, UserContact};
pub use user::{CurrentUser, User};
