//! Bodies of the CLI subcommands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sockrpc_client::ClientRegistry;
use sockrpc_common::config::{ConfigSource, FileConfig};

/// Parses the `--args` option: a JSON array of positional arguments.
///
/// A lone non-array value is accepted as a single argument.
pub fn parse_args(raw: &str) -> Result<Vec<Value>> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("Invalid JSON in args: {raw}"))?;
    Ok(match value {
        Value::Array(items) => items,
        other => vec![other],
    })
}

/// Calls `method` on `module` and returns the result serialized as JSON.
pub fn run_call(config_path: &Path, module: &str, method: &str, raw_args: &str) -> Result<String> {
    let args = parse_args(raw_args)?;
    let config = FileConfig::load(config_path)?;
    let registry = ClientRegistry::new(Arc::new(config));

    let result = registry
        .call(module, method, args)
        .with_context(|| format!("Call to {module}.{method} failed"))?;
    registry.close_all();

    Ok(serde_json::to_string(&result)?)
}

/// Validates every module in the file, returning one `key -> domain` line
/// per module.
pub fn check_config(config_path: &Path) -> Result<Vec<String>> {
    let config = FileConfig::load(config_path)?;
    let modules = config.modules();
    if modules.is_empty() {
        bail!("No modules defined in {}", config_path.display());
    }

    let mut lines = Vec::with_capacity(modules.len());
    let mut failures = Vec::new();
    for key in modules {
        match config.resolve(&key) {
            Ok(module) => lines.push(format!("{key} -> {}", module.endpoint())),
            Err(e) => failures.push(e.to_string()),
        }
    }

    if !failures.is_empty() {
        bail!("Invalid configuration:\n  {}", failures.join("\n  "));
    }
    Ok(lines)
}
