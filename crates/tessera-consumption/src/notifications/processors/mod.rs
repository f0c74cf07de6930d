//! Built-in notification item processors

mod attribute_succeeded;
mod deletion_notice;

pub use attribute_succeeded::AttributeSucceededProcessor;
pub use deletion_notice::DeletionNoticeProcessor;
