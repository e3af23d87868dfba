//! Printers: banners and markdown reports (termimad).

use owo_colors::OwoColorize;
use termimad::MadSkin;

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}

pub fn banner(title: &str, subtitle: &str) {
    let rule = "═".repeat(title.chars().count().max(subtitle.chars().count()) + 4);
    println!("{}", rule.cyan());
    println!("  {}", title.bold());
    if !subtitle.is_empty() {
        println!("  {}", subtitle.dimmed());
    }
    println!("{}", rule.cyan());
}
