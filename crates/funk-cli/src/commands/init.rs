use std::path::Path;

use anyhow::bail;
use funk_core::FunkConfig;

/// Write a funk.toml scaffold with the defaults spelled out.
pub fn init(path: &str, force: bool) -> anyhow::Result<()> {
    let target = Path::new(path);
    if target.exists() && !force {
        bail!("{path} already exists (use --force to overwrite)");
    }

    let toml_str = FunkConfig::scaffold().to_toml_string()?;
    std::fs::write(target, &toml_str)?;

    println!("✓ Wrote {path}");
    Ok(())
}
