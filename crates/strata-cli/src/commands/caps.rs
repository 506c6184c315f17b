//! Capabilities command

use strata_backend_raster::{DEFAULT_IMAGE_CACHE_BYTES, SkiaBackend};
use strata_pipeline::{MemoryBudget, OutputFormat, QualityLevel, RasterBackend, RendererSettings};

const MIB: u64 = 1024 * 1024;

pub fn run() {
    let backend = SkiaBackend::new();
    let caps = backend.capabilities();

    println!("Strata Render Capabilities");
    println!("==========================\n");

    println!("Backend: {}", backend.name());
    println!("  Image cache: {} MiB", DEFAULT_IMAGE_CACHE_BYTES as u64 / MIB);

    println!();
    println!("Output Formats:");
    for format in [OutputFormat::Png, OutputFormat::Jpeg, OutputFormat::Heic] {
        match caps.negotiate(format) {
            Some(negotiation) if !negotiation.is_fallback() => {
                println!(
                    "  ✓ {:<5} {}{}",
                    format.extension(),
                    format.mime_type(),
                    if format.supports_transparency() {
                        " (alpha)"
                    } else {
                        ""
                    }
                );
            }
            Some(negotiation) => {
                println!(
                    "  ✗ {:<5} falls back to {}",
                    format.extension(),
                    negotiation.delivered.extension()
                );
            }
            None => println!("  ✗ {:<5} unavailable", format.extension()),
        }
    }

    println!();
    println!("Quality Presets:");
    for quality in QualityLevel::ALL {
        println!(
            "  {:<9} scale {}x, compression {:.2}",
            quality.name(),
            quality.scale_factor(),
            quality.compression_quality()
        );
    }

    println!();
    println!("Memory Budgets (largest single render):");
    for (label, settings) in [
        ("constrained", RendererSettings::constrained()),
        ("default", RendererSettings::default()),
        ("workstation", RendererSettings::workstation()),
    ] {
        let budget = MemoryBudget::from_settings(&settings);
        println!(
            "  {:<11} {:>5} MiB of {:>5} MiB device memory",
            label,
            budget.limit_bytes() / MIB,
            settings.device_memory_bytes / MIB
        );
    }
}
