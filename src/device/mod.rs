/// CPU device, its buffers and counters.
pub mod cpu;
