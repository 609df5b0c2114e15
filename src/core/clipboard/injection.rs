//! Formatting clipboard entries for system-prompt injection and listing
//! (C10). Ported from `clipboard/injection.py`.

use super::manager::{ClipboardError, ClipboardManager};
use super::types::{now_unix, ClipboardEntry};

/// Render a markdown summary table of accessible clipboard entries for
/// injection into a system prompt, or `None` if there are none.
pub fn format_clipboard_context(
    manager: &mut ClipboardManager,
    max_entries: usize,
    show_source: bool,
) -> Result<Option<String>, ClipboardError> {
    let mut entries = manager.list_entries(None, &[], &[], true)?;
    if entries.is_empty() {
        return Ok(None);
    }
    entries.truncate(max_entries);

    let mut lines = vec![
        "## Available Clipboard Entries".to_string(),
        String::new(),
        "| Key | Scope | Lines | Description |".to_string(),
        "|-----|-------|-------|-------------|".to_string(),
    ];

    for entry in &entries {
        let mut desc = entry.short_description.clone().unwrap_or_default();
        if desc.is_empty() && show_source {
            if let Some(path) = &entry.source_path {
                desc = format!("from {path}");
                if let Some(range) = &entry.source_lines {
                    desc.push_str(&format!(":{range}"));
                }
            }
        }
        lines.push(format!("| {} | {} | {} | {} |", entry.key, entry.scope.as_str(), entry.line_count, desc));
    }

    lines.push(String::new());
    lines.push(r#"Use `paste(key="...")` to insert content. Use `clipboard_list` with `verbose: true` to preview."#.to_string());

    let expired_count = manager.count_expired(None)?;
    if expired_count > 0 {
        lines.push(String::new());
        lines.push(format!("*Note: {expired_count} expired entries pending cleanup. Use clipboard_list to review.*"));
    }

    Ok(Some(lines.join("\n")))
}

/// Format a Unix timestamp as relative time: "just now", "2m ago", "3h ago", "4d ago".
pub fn format_time_ago(timestamp: f64) -> String {
    let delta = now_unix() - timestamp;
    if delta < 60.0 {
        "just now".to_string()
    } else if delta < 3600.0 {
        format!("{}m ago", (delta / 60.0) as i64)
    } else if delta < 86400.0 {
        format!("{}h ago", (delta / 3600.0) as i64)
    } else {
        format!("{}d ago", (delta / 86400.0) as i64)
    }
}

fn format_size(byte_count: usize) -> String {
    if byte_count < 1024 {
        format!("{byte_count}B")
    } else if byte_count < 1024 * 1024 {
        format!("{:.1}KB", byte_count as f64 / 1024.0)
    } else {
        format!("{:.1}MB", byte_count as f64 / (1024.0 * 1024.0))
    }
}

/// Format one entry for `clipboard_list` output: header line, source/modified
/// metadata, tags, expiry, and (if `verbose`) a truncated content preview.
pub fn format_entry_detail(entry: &ClipboardEntry, verbose: bool) -> String {
    let mut lines = Vec::new();

    let size_str = format_size(entry.byte_count);
    let mut header = format!("[{}] {} ({} lines, {})", entry.scope.as_str(), entry.key, entry.line_count, size_str);
    if let Some(desc) = &entry.short_description {
        header.push_str(&format!(" - \"{desc}\""));
    }
    lines.push(header);

    let mut meta_parts = Vec::new();
    if let Some(path) = &entry.source_path {
        let mut source = format!("Source: {path}");
        if let Some(range) = &entry.source_lines {
            source.push_str(&format!(":{range}"));
        }
        meta_parts.push(source);
    }

    let mut modified = format!("Modified: {}", format_time_ago(entry.modified_at));
    if let Some(agent) = &entry.modified_by_agent {
        modified.push_str(&format!(" by {agent}"));
    }
    meta_parts.push(modified);
    lines.push(format!("        {}", meta_parts.join(" | ")));

    if !entry.tags.is_empty() {
        lines.push(format!("        Tags: {}", entry.tags.join(", ")));
    }

    if let Some(expires_at) = entry.expires_at {
        if entry.is_expired() {
            lines.push("        [EXPIRED]".to_string());
        } else {
            let remaining = expires_at - now_unix();
            if remaining < 3600.0 {
                lines.push(format!("        Expires in: {}m", (remaining / 60.0) as i64));
            } else {
                lines.push(format!("        Expires in: {}h", (remaining / 3600.0) as i64));
            }
        }
    }

    if verbose {
        let content_lines: Vec<&str> = entry.content.lines().collect();
        let preview_lines: Vec<&str> = if content_lines.len() <= 6 {
            content_lines
        } else {
            let mut v = content_lines[..3].to_vec();
            v.push("...");
            v.extend(&content_lines[content_lines.len() - 3..]);
            v
        };

        lines.push("        ---".to_string());
        for pl in preview_lines {
            let truncated = if pl.len() > 80 { format!("{}...", &pl[..77]) } else { pl.to_string() };
            lines.push(format!("        {truncated}"));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clipboard::manager::ClipboardTtlConfig;
    use crate::core::clipboard::types::ClipboardPermissions;
    use crate::core::clipboard::types::ClipboardScope;
    use tempfile::tempdir;

    #[test]
    fn empty_manager_yields_no_context() {
        let dir = tempdir().unwrap();
        let mut m = ClipboardManager::new(
            "agent".into(),
            dir.path().into(),
            Some(ClipboardPermissions::SANDBOXED),
            Some(dir.path().into()),
            ClipboardTtlConfig::default(),
        );
        assert!(format_clipboard_context(&mut m, 10, true).unwrap().is_none());
    }

    #[test]
    fn context_renders_markdown_table() {
        let dir = tempdir().unwrap();
        let mut m = ClipboardManager::new(
            "agent".into(),
            dir.path().into(),
            Some(ClipboardPermissions::SANDBOXED),
            Some(dir.path().into()),
            ClipboardTtlConfig::default(),
        );
        m.copy("k1".into(), "one\ntwo\n".into(), ClipboardScope::Agent, Some("desc".into()), None, None, vec![], None)
            .unwrap();
        let ctx = format_clipboard_context(&mut m, 10, true).unwrap().unwrap();
        assert!(ctx.contains("k1"));
        assert!(ctx.contains("desc"));
    }

    #[test]
    fn time_ago_buckets() {
        let now = now_unix();
        assert_eq!(format_time_ago(now), "just now");
        assert_eq!(format_time_ago(now - 120.0), "2m ago");
    }

    #[test]
    fn size_formatting_thresholds() {
        assert_eq!(format_size(500), "500B");
        assert_eq!(format_size(2048), "2.0KB");
        assert_eq!(format_size(2 * 1024 * 1024), "2.0MB");
    }
}
