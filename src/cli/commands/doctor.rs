//! CLI command for `bundleforge doctor`
//!
//! Checks that the external build tools the pipeline invokes are
//! installed.

use anyhow::Result;

use crate::cli::output::status;
use crate::infra::toolchain::{is_tool_available, REQUIRED_TOOLS};

/// Execute the doctor command
pub async fn execute() -> Result<()> {
    println!("Checking external build tools\n");

    let mut missing = Vec::new();
    for tool in REQUIRED_TOOLS {
        if is_tool_available(tool) {
            println!("  {} {tool}", status::SUCCESS);
        } else {
            println!("  {} {tool} (not found in PATH)", status::ERROR);
            missing.push(*tool);
        }
    }

    if missing.is_empty() {
        println!("\n{} All build tools available", status::SUCCESS);
        Ok(())
    } else {
        anyhow::bail!("missing tools: {}", missing.join(", "))
    }
}
