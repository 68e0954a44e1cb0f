pub mod notify;
pub mod reboot;
