use anyhow::Result;
use serde_json::json;
use telemetry_gateway::BackendRegistry;

/// Execute the backends command
///
/// Needs no configuration; lists what `[backend] kind` may be set to.
pub fn execute(registry: &BackendRegistry) -> Result<()> {
    let backends: Vec<_> = registry
        .available_backends()
        .into_iter()
        .map(|(kind, description)| json!({ "kind": kind, "description": description }))
        .collect();

    super::print_json(&backends)
}
