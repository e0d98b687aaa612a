// System status display — store stats, per-source counts, last ingest.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::ingest::{LAST_INGEST_AT, LAST_INGEST_RECORDS};

/// Display system status to the terminal.
pub async fn show(db: &Arc<dyn Database>, config: &Config) -> Result<()> {
    if config.uses_postgres() {
        println!("Database: PostgreSQL");
    } else {
        let db_path = config.db_path.as_str();
        let file_size = std::fs::metadata(db_path)
            .map(|m| format_bytes(m.len()))
            .unwrap_or_else(|_| "unknown".to_string());
        println!("Database: {} ({})", db_path, file_size);
    }

    let total = db.count_hotspots().await?;
    println!("Hotspots: {}", total);
    for (source, count) in db.count_by_source().await? {
        println!("  {:<10} {}", source, count);
    }

    match db.get_ingest_state(LAST_INGEST_AT).await? {
        Some(at) => {
            let records = db
                .get_ingest_state(LAST_INGEST_RECORDS)
                .await?
                .unwrap_or_else(|| "?".to_string());
            println!("Last ingest: {} ({} records)", at, records);
        }
        None => {
            println!("Last ingest: never");
            println!("  Run `geih ingest --load` to fetch hotspots");
        }
    }

    let output_dir = config.output_dir.as_path();
    println!("Run files: {}", describe_dir(output_dir));
    println!(
        "FIRMS key: {}",
        if config.firms_api_key.is_empty() { "not set" } else { "configured" }
    );

    Ok(())
}

fn describe_dir(dir: &Path) -> String {
    match std::fs::read_dir(dir) {
        Ok(entries) => format!("{} ({} files)", dir.display(), entries.count()),
        Err(_) => format!("{} (not created yet)", dir.display()),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
