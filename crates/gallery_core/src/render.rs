use std::fmt::Write;

use crate::{CardStatus, CardView, GalleryView};

/// Text shown on cards whose capture has not finished yet.
pub const PENDING_MARKER: &str = "Processing...";
/// Text shown on cards whose capture failed without any image.
pub const FAILED_MARKER: &str = "Failed to load";

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Demo Gallery</title>
<style>
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: system-ui, sans-serif; background: #0f0f0f; color: #fff; padding: 2rem; }
h1 { text-align: center; margin-bottom: 1rem; font-size: 2.5rem; color: #8c9cf0; }
.progress { text-align: center; color: #888; margin-bottom: 2rem; }
.gallery { display: grid; grid-template-columns: repeat(auto-fill, minmax(400px, 1fr)); gap: 2rem; max-width: 1400px; margin: 0 auto; }
.card { background: #1a1a1a; border: 1px solid #333; border-radius: 12px; overflow: hidden; }
.card.failed { border-color: #7a2e2e; }
.shot { height: 300px; background: #000; display: flex; align-items: center; justify-content: center; color: #666; }
.shot img { width: 100%; height: 100%; object-fit: cover; }
.shot .pending { font-style: italic; }
.info { padding: 1.5rem; }
.info h2 { font-size: 1.5rem; margin-bottom: 0.5rem; }
.info a { color: #667eea; text-decoration: none; margin-right: 1rem; }
details { margin-top: 0.5rem; }
summary { cursor: pointer; color: #888; font-size: 0.8rem; }
pre { background: #000; color: #0f0; padding: 0.5rem; font-size: 0.7rem; max-height: 200px; overflow-y: auto; white-space: pre-wrap; }
.updated { text-align: center; color: #666; margin-top: 3rem; font-size: 0.9rem; }
</style>
</head>
<body>
<h1>Demo Gallery</h1>
"#;

/// Renders the whole gallery document.
///
/// Output depends only on `view` and `updated_at`.
pub fn render_gallery(view: &GalleryView, updated_at: &str) -> String {
    let mut html = String::with_capacity(HEAD.len() + view.cards.len() * 512);
    html.push_str(HEAD);
    let _ = writeln!(
        html,
        "<p class=\"progress\">{} of {} captured ({} failed)</p>",
        view.completed, view.total, view.failed
    );
    html.push_str("<div class=\"gallery\">\n");
    for card in &view.cards {
        render_card(&mut html, card);
    }
    html.push_str("</div>\n");
    let _ = writeln!(
        html,
        "<div class=\"updated\">Last updated: {}</div>",
        escape_html(updated_at)
    );
    html.push_str("</body>\n</html>\n");
    html
}

fn render_card(html: &mut String, card: &CardView) {
    let class = match card.status {
        CardStatus::Failed { .. } => "card failed",
        _ => "card",
    };
    let _ = writeln!(
        html,
        "<div class=\"{class}\" id=\"item-{}\">",
        escape_html(&card.item_id)
    );
    html.push_str("<div class=\"shot\">");
    match &card.status {
        CardStatus::Pending => {
            let _ = write!(html, "<span class=\"pending\">{PENDING_MARKER}</span>");
        }
        CardStatus::Captured { artifact_path }
        | CardStatus::Failed {
            artifact_path: Some(artifact_path),
        } => {
            let _ = write!(
                html,
                "<img src=\"{}\" alt=\"Demo screenshot\">",
                escape_html(artifact_path)
            );
        }
        CardStatus::Failed {
            artifact_path: None,
        } => {
            let _ = write!(html, "<span>{FAILED_MARKER}</span>");
        }
    }
    html.push_str("</div>\n<div class=\"info\">\n");
    let _ = writeln!(html, "<h2>{}</h2>", escape_html(&card.label));
    let _ = writeln!(
        html,
        "<a href=\"{}\" target=\"_blank\">View Demo &rarr;</a><a href=\"{}\" target=\"_blank\">Browse Code &rarr;</a>",
        escape_html(&card.demo_url),
        escape_html(&card.code_url)
    );
    if !card.diagnostics.is_empty() {
        let _ = writeln!(
            html,
            "<details><summary>Console Messages ({})</summary><pre>{}</pre></details>",
            card.diagnostics.len(),
            escape_html(&card.diagnostics.join("\n"))
        );
    }
    html.push_str("</div>\n</div>\n");
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
