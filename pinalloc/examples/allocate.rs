//! Allocate pins for a feature file and print the assignment.

use pinalloc::prelude::*;
use std::path::Path;

fn main() -> Result<(), PinAllocError> {
    let mut args = std::env::args().skip(1);
    let mcu = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/stm32f303k8.xml".to_string());
    let features = args
        .next()
        .unwrap_or_else(|| "tests/fixtures/board.txt".to_string());

    for path in [&mcu, &features] {
        if !Path::new(path).exists() {
            eprintln!("File not found: {}", path);
            eprintln!("Usage: cargo run --example allocate [mcu.xml] [features.txt]");
            std::process::exit(1);
        }
    }

    let options = AllocationOptions::new(SignalPolicy::Lenient);
    let result = PinAllocCore::allocate_files(Path::new(&mcu), Path::new(&features), &options)?;

    println!("Pin assignment for: {}", result.mcu.display_name());
    println!(
        "{} features, {} pins ({} decisions)",
        result.features.len(),
        result.binding_count(),
        result.stats.decisions
    );
    println!();

    for feature in &result.features {
        println!("{} ({})", feature.name, feature.instance_label());
        for binding in &feature.bindings {
            println!("  {} = {}", binding.label, binding.pin);
        }
    }

    if result.stats.dropped_signals > 0 {
        println!("\n{} vendor signals were not recognized.", result.stats.dropped_signals);
    }
    Ok(())
}
