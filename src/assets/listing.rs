//! Directory listings for mounts with `listing = true`.

use std::path::Path;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::assets::error::AssetError;

/// Characters escaped in listing hrefs.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One row of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Read `dir`, directories first, each group sorted by name.
pub async fn read_listing(dir: &Path) -> Result<Vec<ListingEntry>, AssetError> {
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| AssetError::from_io(dir, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|e| AssetError::from_io(dir, e))?
    {
        // Names that are not UTF-8 cannot be requested through a URL anyway.
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(entry = %name, error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        entries.push(ListingEntry {
            name,
            is_dir: metadata.is_dir(),
            size: metadata.len(),
        });
    }

    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

/// Render an HTML listing for the directory at `url_path` (slash-terminated).
pub fn render_listing(url_path: &str, entries: &[ListingEntry]) -> String {
    let title = escape_html(url_path);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n<body>\n<h1>Index of {title}</h1>\n<ul>\n"
    );

    if url_path != "/" {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }

    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        let href = utf8_percent_encode(&entry.name, HREF).to_string();
        html.push_str(&format!(
            "<li><a href=\"./{}{}\">{}{}</a>{}</li>\n",
            escape_html(&href),
            suffix,
            escape_html(&entry.name),
            suffix,
            if entry.is_dir {
                String::new()
            } else {
                format!(" <small>{} bytes</small>", entry.size)
            },
        ));
    }

    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_names() {
        let entries = vec![
            ListingEntry { name: "sub".into(), is_dir: true, size: 0 },
            ListingEntry { name: "<script>.js".into(), is_dir: false, size: 12 },
        ];
        let html = render_listing("/uv/", &entries);

        assert!(html.contains("Index of /uv/"));
        assert!(html.contains("href=\"./sub/\""));
        assert!(html.contains("&lt;script&gt;.js"));
        assert!(html.contains("href=\"./%3Cscript%3E.js\""));
        assert!(html.contains("12 bytes"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_root_has_no_parent_link() {
        let html = render_listing("/", &[]);
        assert!(!html.contains("../"));
    }

    #[tokio::test]
    async fn test_read_listing_orders_dirs_first() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "aa").unwrap();
        std::fs::create_dir(dir.path().join("z")).unwrap();

        let entries = read_listing(dir.path()).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["z", "a.txt", "b.txt"]);
        assert_eq!(entries[1].size, 2);
    }
}
