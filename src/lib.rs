//! Annual energy production estimates for wind plants from turbine
//! telemetry and revenue meter data.

pub mod commands;
pub mod domain;
pub mod services;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
