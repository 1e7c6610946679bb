// Consumer facade over a supervised channel
mod core;

pub use core::RealtimeChannel;
