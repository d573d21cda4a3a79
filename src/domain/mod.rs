pub mod aligned;
pub mod calendar;
pub mod quality;
pub mod records;
