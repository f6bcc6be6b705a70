//! Per-site JSON snapshots of scraped products, so a long run can be
//! re-exported without scraping again.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::Product;

/// `<dir>/<site>_<YYYYmmdd_HHMMSS>.json`
pub fn save_checkpoint(products: &[Product], dir: &Path, site: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{}_{}.json", site, stamp));
    std::fs::write(&path, serde_json::to_string_pretty(products)?)?;
    log::info!("Checkpoint saved: {} ({} products)", path.display(), products.len());
    Ok(path)
}

/// Read checkpoint files back in order. Directories contribute every `.json`
/// file they contain, sorted by name.
pub fn load_checkpoints(paths: &[PathBuf]) -> Result<Vec<Product>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }

    let mut products = Vec::new();
    for file in &files {
        let text = std::fs::read_to_string(file)?;
        let mut batch: Vec<Product> = serde_json::from_str(&text)?;
        log::info!("Loaded {} products from {}", batch.len(), file.display());
        products.append(&mut batch);
    }
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fitment;

    #[test]
    fn save_then_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut product = Product::new("https://www.tascaparts.com/oem-parts/gm-wheel-1");
        product.title = "Wheel".into();
        product.fitments.push(Fitment {
            year: "2020".into(),
            make: "GMC".into(),
            ..Fitment::default()
        });

        let path = save_checkpoint(&[product.clone()], dir.path(), "tascaparts").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("tascaparts_") && name.ends_with(".json"));
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load_checkpoints(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].fitments[0].make, "GMC");

        let loaded = load_checkpoints(&[path]).unwrap();
        assert_eq!(loaded[0].title, "Wheel");
    }

    #[test]
    fn bad_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_checkpoints(&[path]).is_err());
    }
}
