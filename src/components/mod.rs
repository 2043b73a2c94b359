//! Reusable UI components
//!
//! - `keybindings` - key table per mode; drives dispatch, nav bar and help
//! - `help_overlay` - floating help window

pub mod help_overlay;
pub mod keybindings;

use ratatui::layout::Rect;

/// Rectangle centered in `area`, sized by percentage and clamped to bounds
pub fn centered_rect(
    width_percent: u16,
    height_percent: u16,
    min: (u16, u16),
    max: (u16, u16),
    area: Rect,
) -> Rect {
    let percent = |length: u16, pct: u16| (u32::from(length) * u32::from(pct) / 100) as u16;
    let width = percent(area.width, width_percent)
        .clamp(min.0, max.0)
        .min(area.width);
    let height = percent(area.height, height_percent)
        .clamp(min.1, max.1)
        .min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fits_small_terminals() {
        let area = Rect::new(0, 0, 30, 10);
        let rect = centered_rect(60, 70, (50, 15), (80, 35), area);
        assert_eq!(rect, area);

        let rect = centered_rect(50, 50, (10, 5), (80, 35), Rect::new(0, 0, 100, 40));
        assert_eq!(rect, Rect::new(25, 10, 50, 20));
    }
}
