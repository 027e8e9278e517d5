// Thin facade over `tracing` so simulation code logs in one consistent shape.
// The subscriber (format, level, destination) is installed by the binary.

// Normal progress: stages, summaries.
pub fn info(msg: &str) {
    tracing::info!("{msg}");
}

// Something odd, but the run can continue.
pub fn warn(msg: &str) {
    tracing::warn!("{msg}");
}

// Numeric metric in a fixed shape, easy to grep or parse later.
pub fn scalar(step: u64, name: &str, value: f32) {
    tracing::debug!(target: "scalar", step, name, value);
}
