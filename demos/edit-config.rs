//! Loads a configuration file, edits a few keys and writes it back. Every
//! line that was not edited keeps its exact formatting.

use yamlcfg::{SetValue, YamlDocument};

const CONFIG: &str = r#"# Service configuration
service:
  name: "inventory"   # shown in dashboards
  workers: 4

  # Upstream databases, tried in order
  databases:
  - db1.internal
  - db2.internal

features: [ search, export ]
"#;

fn main() -> miette::Result<()> {
    let dir = scratch_dir()?;
    let path = dir.join("service.yml");
    std::fs::write(&path, CONFIG).map_err(yamlcfg::YamlError::from)?;

    let mut doc = YamlDocument::from_path(&path)?;
    println!("workers: {}", doc.get_number::<u32>("service.workers")?);
    println!("databases: {:?}", doc.get_string_list("service.databases")?);

    doc.set("service.workers", 8)?;
    doc.set("service.databases.2", "db3.internal")?;
    doc.set("service.timeout", "30s")?;
    doc.set("features", SetValue::flow(["search", "export", "audit log"]))?;
    doc.save(&path)?;

    let saved = std::fs::read_to_string(&path).map_err(yamlcfg::YamlError::from)?;
    println!("{saved}");
    Ok(())
}

fn scratch_dir() -> miette::Result<std::path::PathBuf> {
    let dir = std::env::temp_dir().join("yamlcfg-edit-config");
    std::fs::create_dir_all(&dir).map_err(yamlcfg::YamlError::from)?;
    Ok(dir)
}
