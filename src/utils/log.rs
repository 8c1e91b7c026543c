// src/utils/log.rs

//! Progress formatting over the `log` facade.
//!
//! Gives pipeline output a consistent shape: a header per run, numbered
//! steps, indented sub-items and a closing summary.

/// Width of header borders.
const WIDTH: usize = 60;

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(WIDTH);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
