pub mod payment;
pub mod retention;
pub mod subscription;
pub mod voice_minutes;
