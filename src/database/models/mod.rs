pub mod attendance;
pub mod card;
pub mod connection;
pub mod contact;
pub mod notification;
pub mod otp;
pub mod professional;
pub mod tag;
pub mod user;
