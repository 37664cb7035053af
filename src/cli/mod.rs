pub mod audit;
pub mod check;
pub mod fetch;
pub mod init;
pub mod log;
pub mod shot;
pub mod visual;
