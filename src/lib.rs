// Export-to-review pipeline: turns a host export session into review versions
// with uploaded media on a remote project-management service.

pub mod config;
pub mod jobs;
pub mod preset;
pub mod remote;
pub mod review;

// Test support (only available with test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use config::Config;
