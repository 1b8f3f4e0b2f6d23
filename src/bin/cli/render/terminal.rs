use studydesk_lib::subjects::{HistoryEntry, Role};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Wrap `text` in a color code when colors are enabled
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Section heading, e.g. the subject name above its material
pub fn heading(text: &str, use_color: bool) -> String {
    paint(text, Color::BOLD, use_color)
}

/// Render a chat history as alternating labelled turns
pub fn render_history(entries: &[HistoryEntry], use_color: bool) -> String {
    let mut lines = Vec::new();
    for entry in entries {
        let (label, color) = match entry.role {
            Role::User => ("You", Color::CYAN),
            Role::Assistant => ("Assistant", Color::GREEN),
        };
        let stamp = entry.timestamp.format("%Y-%m-%d %H:%M").to_string();
        lines.push(format!(
            "{} {}",
            paint(label, color, use_color),
            paint(&stamp, Color::GRAY, use_color)
        ));
        lines.push(entry.content.trim_end().to_string());
        lines.push(String::new());
    }

    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
