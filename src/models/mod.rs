pub mod courier;
pub mod notification;
pub mod order;
pub mod rules;
pub mod user;
