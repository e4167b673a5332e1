pub mod channel;
pub mod health;
pub mod proxy;
pub mod video;
