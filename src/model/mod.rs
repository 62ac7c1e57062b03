pub mod link;
pub mod story;
pub mod ticket;
