//! Archive display formatting
//!
//! Formats catalog listings and archive contents for terminal output.

use chrono::{DateTime, Utc};
use tabled::{builder::Builder, settings::Style};

use crate::archive::EntrySummary;
use crate::backup::ArchiveInfo;

/// Format a catalog listing as a table
pub fn format_archive_list(archives: &[ArchiveInfo], now: DateTime<Utc>) -> String {
    if archives.is_empty() {
        return "No backups found.".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["Archive", "Name", "Kind", "Size", "Age"]);

    for archive in archives {
        let (name, kind) = match &archive.label {
            Some(label) => (label.name.clone(), label.kind.clone()),
            None => ("-".to_string(), "-".to_string()),
        };
        let age = now.signed_duration_since(created_at(archive));

        builder.push_record([
            archive.name.clone(),
            name,
            kind,
            format_size(archive.size_bytes),
            format_duration(age),
        ]);
    }

    let mut output = builder.build().with(Style::sharp()).to_string();
    output.push_str(&format!("\nTotal: {} backup(s)", archives.len()));
    output
}

/// Format one archive's metadata and entry counts
pub fn format_archive_details(archive: &ArchiveInfo, entries: &[EntrySummary]) -> String {
    use crate::archive::EntryKind;

    let count = |kind: EntryKind| entries.iter().filter(|e| e.kind == kind).count();
    let content_bytes: u64 = entries.iter().map(|e| e.size).sum();

    let mut output = String::new();
    output.push_str("Backup Details\n");
    output.push_str("==============\n");
    output.push_str(&format!("File:    {}\n", archive.path.display()));
    output.push_str(&format!("Size:    {}\n", format_size(archive.size_bytes)));
    match &archive.label {
        Some(label) => {
            output.push_str(&format!("Name:    {}\n", label.name));
            output.push_str(&format!("Kind:    {}\n", label.kind));
            output.push_str(&format!(
                "Created: {}\n",
                label.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        None => {
            output.push_str(&format!(
                "Created: {}\n",
                created_at(archive).format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
    }
    output.push('\n');
    output.push_str("Contents:\n");
    output.push_str(&format!("  Entries:     {}\n", entries.len()));
    output.push_str(&format!("  Files:       {}\n", count(EntryKind::File)));
    output.push_str(&format!("  Directories: {}\n", count(EntryKind::Directory)));
    output.push_str(&format!("  Other:       {}\n", count(EntryKind::Other)));
    output.push_str(&format!("  Content:     {}", format_size(content_bytes)));
    output
}

/// Format stored entries as a table
pub fn format_entry_list(entries: &[EntrySummary]) -> String {
    if entries.is_empty() {
        return "Archive is empty.".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["Path", "Type", "Mode", "Size"]);
    for entry in entries {
        builder.push_record([
            entry.path.clone(),
            entry.kind.to_string(),
            format!("{:o}", entry.mode),
            entry.size.to_string(),
        ]);
    }
    builder.build().with(Style::sharp()).to_string()
}

/// Format a duration in human-readable form
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    let months = days / 30;
    format!("{}mo", months)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn created_at(archive: &ArchiveInfo) -> DateTime<Utc> {
    DateTime::from_timestamp(archive.created_at_epoch_seconds, 0).unwrap_or_default()
}
