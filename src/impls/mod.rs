pub mod mailer;
pub mod tokener;
