pub mod signals;
pub mod watch;
