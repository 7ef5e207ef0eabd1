pub mod loader;
pub mod synthetic;

pub use loader::{load_csv, load_json};
pub use synthetic::{bars_from_closes, generate_synthetic_bars, generate_synthetic_bars_seeded};

use std::path::Path;

use common::{BacktestError, BarSeries, Result};

/// Load bars from file, detecting format from extension
pub fn load_file(path: &Path) -> Result<BarSeries> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let bars = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        _ => {
            return Err(BacktestError::DataLoadError(format!(
                "Unsupported file format: {}",
                ext
            )))
        }
    };

    BarSeries::new(bars)
}
