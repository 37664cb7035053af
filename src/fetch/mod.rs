pub mod client;
pub mod response;

pub use client::PageFetcher;
pub use response::FinalResponse;
