//! # Voxel Engine Application Entry Point
//!
//! This is the main entry point for the native demo of the voxel engine.
//! It simply calls into the library's `run()` function and reports failures.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info VOXEL_ENGINE_CONFIG=engine.json cargo run --release
//! ```

fn main() {
    if let Err(err) = voxel_engine::run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
