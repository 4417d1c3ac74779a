use std::fs;

use tracing::instrument;

use super::{Workspace, CONFIG_FILE};

#[instrument(skip_all)]
pub fn run(workspace: &Workspace) -> anyhow::Result<()> {
    let root = &workspace.root;
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("Already initialized (found existing {})", config_path.display());
    }

    fs::create_dir_all(root)
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", root.display()))?;

    workspace
        .config
        .save(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to create {CONFIG_FILE}: {e}"))?;

    println!("Initialized fragment directory {}", root.display());
    println!("  Created: {CONFIG_FILE}");
    println!();
    println!("Next steps:");
    println!("  prk -r {} split -i document.txt -o document.prk", root.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use perky::Config;

    use super::*;

    fn workspace(root: &std::path::Path) -> Workspace {
        Workspace {
            root: root.to_path_buf(),
            input: None,
            output: None,
            config: Config::default(),
        }
    }

    #[test]
    fn writes_default_configuration() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("fragments");

        run(&workspace(&root)).unwrap();

        let config = Config::load(&root.join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn refuses_to_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "keep me").unwrap();

        assert!(run(&workspace(tmp.path())).is_err());
        assert_eq!(
            fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap(),
            "keep me"
        );
    }
}
