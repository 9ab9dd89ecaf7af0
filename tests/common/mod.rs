// tests/common/mod.rs

#![allow(dead_code, unused_imports)]

pub use obsidia_test_utils::builders::ServerConfigBuilder;
pub use obsidia_test_utils::fake_server::{FakeServer, FAKE_SERVER_SCRIPT, STUBBORN_SERVER_SCRIPT};
pub use obsidia_test_utils::listeners::RecordingListener;
pub use obsidia_test_utils::{datetime, eventually, init_tracing, with_timeout};

use std::error::Error;

pub type TestResult = Result<(), Box<dyn Error>>;
