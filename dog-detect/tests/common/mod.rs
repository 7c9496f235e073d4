#![allow(dead_code, unused_imports)]

pub use dog_core::synthetic::{blob_grid, blob_pyramids, Blob, BACKGROUND, BASE_SIGMA};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").with_test_writer().try_init();
}
