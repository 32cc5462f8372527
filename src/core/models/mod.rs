pub mod comment;
pub mod feed;
pub mod inquiry;
pub mod option;
pub mod survey;
