pub mod apply;
pub mod dispatch;
pub mod eligibility;
