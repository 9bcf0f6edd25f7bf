//! List commands

use crate::targets;

/// List all targets compiled into this binary
pub fn list_targets() {
    println!("Available targets:");
    println!();
    for t in targets::available_targets() {
        println!("  {:8} - {}", t.name, t.description);
    }
}
