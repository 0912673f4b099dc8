//! Catalog command - Show extraction routines and their gates.

use anyhow::Result;
use clap::Args;
use tfex_core::{normalize_service, Capabilities, ExtractionCatalog, Routine};

#[derive(Args)]
pub struct CatalogArgs {
    /// Enabled service to evaluate the gates against (repeatable),
    /// e.g. `compute` or `storage.googleapis.com`
    #[arg(long = "capability", value_name = "SERVICE")]
    pub capabilities: Vec<String>,
}

pub fn execute(args: CatalogArgs) -> Result<()> {
    let catalog = ExtractionCatalog::standard();

    if args.capabilities.is_empty() {
        println!("📋 {} extraction routines", catalog.len());
        for line in table(&catalog, None) {
            println!("{}", line);
        }
        return Ok(());
    }

    let capabilities: Capabilities = args
        .capabilities
        .iter()
        .map(|c| normalize_service(c))
        .collect();
    let unlocked = catalog.routines_for(&capabilities);
    println!(
        "📋 {} of {} routines run with: {}",
        unlocked.len(),
        catalog.len(),
        capabilities.iter().collect::<Vec<_>>().join(", ")
    );
    for line in table(&catalog, Some(&capabilities)) {
        println!("{}", line);
    }
    Ok(())
}

/// One line per routine; with capabilities, each line is marked as
/// running or gated out.
fn table(catalog: &ExtractionCatalog, capabilities: Option<&Capabilities>) -> Vec<String> {
    catalog
        .routines()
        .iter()
        .map(|routine| {
            let marker = match capabilities {
                Some(caps) if routine.should_run(caps) => "✅ ",
                Some(_) => "🚫 ",
                None => "",
            };
            format!(
                "   {}{:<22} {:<13} {:<28} {}",
                marker,
                routine.id,
                format!("{:?}", routine.account).to_lowercase(),
                routine.requires.describe(),
                output_of(routine)
            )
        })
        .collect()
}

fn output_of(routine: &Routine) -> &'static str {
    tfex_hcl::unit_for_kind(routine.id)
        .map(|unit| unit.file_name)
        .unwrap_or(tfex_hcl::DUMP_FILE)
}
