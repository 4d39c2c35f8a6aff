mod log;
mod operation;

pub use self::log::OperationLog;
pub use operation::{OperationGroup, SingleOperation, Step};
