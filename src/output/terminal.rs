// Colored terminal output for hotspot lists, stage reports and source metadata.

use colored::Colorize;

use super::truncate_chars;
use crate::connectors::traits::SourceMetadata;
use crate::db::models::Hotspot;
use crate::pipeline::{StageReport, StageStatus};

/// Display a hotspot list in the terminal.
pub fn display_hotspots(hotspots: &[Hotspot]) {
    if hotspots.is_empty() {
        println!("No hotspots match. Run `geih ingest --load` to fetch data.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Fire Hotspots ({} detections) ===", hotspots.len()).bold()
    );
    println!();

    println!(
        "  {:<19}  {:>9}  {:>10}  {:>4}  {:>7}  {:>7}  {:<7}  {:<16}",
        "Acquired".dimmed(),
        "Lat".dimmed(),
        "Lon".dimmed(),
        "Conf".dimmed(),
        "Bright".dimmed(),
        "FRP".dimmed(),
        "Source".dimmed(),
        "Biome".dimmed(),
    );
    println!("  {}", "-".repeat(92).dimmed());

    for hotspot in hotspots {
        let confidence = format!("{:>4}", hotspot.confidence);
        println!(
            "  {:<19}  {:>9.4}  {:>10.4}  {}  {:>7.1}  {:>7.1}  {:<7}  {:<16}",
            hotspot.acquisition_date.format("%Y-%m-%d %H:%M"),
            hotspot.latitude,
            hotspot.longitude,
            colorize_confidence(hotspot.confidence, &confidence),
            hotspot.brightness.unwrap_or(0.0),
            hotspot.frp.unwrap_or(0.0),
            hotspot.source,
            truncate_chars(hotspot.biome.as_deref().unwrap_or("-"), 16),
        );
    }

    println!();

    let high = hotspots.iter().filter(|h| h.confidence >= 80).count();
    if high > 0 {
        println!("  {} {} high-confidence detections", "!!".red().bold(), high);
    }
}

/// Display the reports of one pipeline run.
pub fn display_stage_reports(reports: &[StageReport]) {
    for report in reports {
        let status = match report.status {
            StageStatus::Success => "success".green(),
            StageStatus::Error => "error".red().bold(),
        };
        println!(
            "  {:<10} {:<8} {:>6} records  {:>4} invalid  {}",
            report.stage.to_string().bold(),
            status,
            report.records,
            report.invalid_records,
            report.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
        );
        if let Some(ref message) = report.message {
            println!("             {}", message.yellow());
        }
    }
}

/// Display a data source description.
pub fn display_metadata(meta: &SourceMetadata) {
    println!("{}", meta.name.bold());
    println!("  {}", meta.description);
    println!("  Data types:          {}", meta.data_types.join(", "));
    println!("  Spatial coverage:    {}", meta.spatial_coverage);
    println!("  Temporal resolution: {}", meta.temporal_resolution);
    println!("  Formats:             {}", meta.formats.join(", "));
    println!("  Docs:                {}", meta.documentation_url.cyan());
}

fn colorize_confidence(confidence: i32, text: &str) -> colored::ColoredString {
    match confidence {
        c if c >= 80 => text.red().bold(),
        c if c >= 50 => text.yellow(),
        _ => text.dimmed(),
    }
}
