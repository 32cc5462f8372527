pub mod aggregate;
pub mod comment;
pub mod feed;
pub mod inquiry;
pub mod survey;
pub mod tripcode;
pub mod validate;
