//! Colour roles for the summary, the progress line and `--help`
//!
//! Colour is applied only when the caller passes `enabled`, so the decision
//! (terminal, `--color`, `--no-color`, `NO_COLOR`) is made once per run.
//!
//! ```
//! use clamsweep::core::styles::StyleRole;
//! assert_eq!(StyleRole::Infected.paint("2 infected", false), "2 infected");
//! assert_eq!(StyleRole::Infected.paint("2 infected", true), "\x1b[91m2 infected\x1b[0m");
//! ```

use clap::builder::styling::{AnsiColor, Color as ClapColor, Style, Styles};
use colored::Color;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StyleRole {
    Header,
    Literal,
    Placeholder,
    Clean,
    Infected,
    Warning,
    Error,
    Path,
    /// Plain numbers and names
    Value,
    Dim,
}

impl StyleRole {
    pub fn color(self) -> Option<Color> {
        match self {
            StyleRole::Header | StyleRole::Warning => Some(Color::Yellow),
            StyleRole::Literal | StyleRole::Path => Some(Color::Cyan),
            StyleRole::Placeholder | StyleRole::Clean => Some(Color::Green),
            StyleRole::Infected | StyleRole::Error => Some(Color::BrightRed),
            StyleRole::Dim => Some(Color::BrightBlack),
            StyleRole::Value => None,
        }
    }

    pub fn paint(self, text: &str, enabled: bool) -> String {
        match self.color() {
            Some(color) if enabled => format!("\x1b[{}m{}\x1b[0m", color.to_fg_str(), text),
            _ => text.to_string(),
        }
    }

    fn clap_style(self, bold: bool) -> Style {
        let style = Style::new().fg_color(self.color().and_then(ansi).map(ClapColor::Ansi));
        if bold {
            style.bold()
        } else {
            style
        }
    }
}

fn ansi(color: Color) -> Option<AnsiColor> {
    Some(match color {
        Color::Black => AnsiColor::Black,
        Color::Red => AnsiColor::Red,
        Color::Green => AnsiColor::Green,
        Color::Yellow => AnsiColor::Yellow,
        Color::Blue => AnsiColor::Blue,
        Color::Magenta => AnsiColor::Magenta,
        Color::Cyan => AnsiColor::Cyan,
        Color::White => AnsiColor::White,
        Color::BrightBlack => AnsiColor::BrightBlack,
        Color::BrightRed => AnsiColor::BrightRed,
        Color::BrightGreen => AnsiColor::BrightGreen,
        Color::BrightYellow => AnsiColor::BrightYellow,
        Color::BrightBlue => AnsiColor::BrightBlue,
        Color::BrightMagenta => AnsiColor::BrightMagenta,
        Color::BrightCyan => AnsiColor::BrightCyan,
        Color::BrightWhite => AnsiColor::BrightWhite,
        Color::TrueColor { .. } => return None,
    })
}

/// clap help styles built from the same roles
pub fn palette_to_clap(enabled: bool) -> Styles {
    if !enabled {
        return Styles::plain();
    }

    Styles::styled()
        .header(StyleRole::Header.clap_style(true))
        .usage(StyleRole::Header.clap_style(true))
        .literal(StyleRole::Literal.clap_style(false))
        .placeholder(StyleRole::Placeholder.clap_style(false))
        .valid(StyleRole::Clean.clap_style(false))
        .invalid(StyleRole::Warning.clap_style(false))
        .error(StyleRole::Error.clap_style(true))
}
