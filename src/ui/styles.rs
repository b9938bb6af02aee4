//! # UI Styling Module
//!
//! Button and text styling shared by the scanner views.

use iced::widget::button;
use iced::{Background, Border, Color};

/// Secondary text, e.g. RSSI lines and the empty-list message
pub const MUTED_TEXT: Color = Color::from_rgb(0.4, 0.4, 0.4);

pub const WARNING_TEXT: Color = Color::from_rgb(0.75, 0.45, 0.0);

/// Shifts every channel of `color` by `delta`, clamped to [0, 1]
fn shade(color: Color, delta: f32) -> Color {
    Color::from_rgb(
        (color.r + delta).clamp(0.0, 1.0),
        (color.g + delta).clamp(0.0, 1.0),
        (color.b + delta).clamp(0.0, 1.0),
    )
}

fn filled(base: Color, border: Color) -> button::Style {
    button::Style {
        background: Some(Background::Color(base)),
        text_color: Color::WHITE,
        border: Border {
            color: border,
            width: 1.0,
            radius: 4.0.into(),
        },
        ..Default::default()
    }
}

/// Style for the start/stop toggle: green while idle, red while scanning
pub fn toggle_button_style(scanning: bool) -> impl Fn(&iced::Theme, button::Status) -> button::Style {
    let base = if scanning {
        Color::from_rgb(0.8, 0.2, 0.2)
    } else {
        Color::from_rgb(0.2, 0.7, 0.2)
    };

    move |_theme: &iced::Theme, status: button::Status| match status {
        button::Status::Active => filled(base, shade(base, 0.1)),
        button::Status::Hovered => filled(shade(base, 0.1), shade(base, 0.2)),
        button::Status::Pressed => filled(shade(base, -0.1), base),
        button::Status::Disabled => button::Style {
            text_color: Color::from_rgb(0.6, 0.6, 0.6),
            ..filled(Color::from_rgb(0.3, 0.3, 0.3), Color::from_rgb(0.4, 0.4, 0.4))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shade_clamps() {
        let light = shade(Color::from_rgb(0.95, 0.5, 0.0), 0.1);
        assert_eq!(light.r, 1.0);
        assert!((light.g - 0.6).abs() < 1e-6);

        let dark = shade(Color::from_rgb(0.05, 0.5, 0.0), -0.1);
        assert_eq!(dark.r, 0.0);
        assert_eq!(dark.b, 0.0);
    }
}
