pub mod mailer;
pub mod repository;
pub mod tokener;
