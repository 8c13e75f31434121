//! # Inventory Desktop Entry Point
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load coordination config (file + env)
//! 3. Bind the global EventBus to a fresh HostLoop
//! 4. Build the Mediator
//! 5. Drive the host loop until Ctrl-C

// Prevents an additional console window on Windows in release
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

fn main() {
    // The actual setup is in lib.rs for better testability
    inventory_desktop_lib::run();
}
