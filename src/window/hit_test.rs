//! Pure hit-test classification for the borderless frame.
//!
//! The window procedure feeds screen-space cursor positions through
//! [`classify`] to decide which non-client zone the cursor is over. Keeping
//! the classification free of any `HWND` access makes it deterministic and
//! testable off-platform; the caller supplies the window rectangle and the
//! caption height.

use std::ops::Range;

/// Pixel tolerance for the resize grips along every border.
pub const RESIZE_GRIP: i32 = 10;

/// Extra caption pixels reserved for the tab strip that hangs below the
/// standard title-bar band.
pub const TAB_STRIP_ALLOWANCE: u32 = 10;

/// Non-client zone under the cursor, mirroring the `HT*` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitZone {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
    Top,
    Bottom,
    Left,
    Right,
    Caption,
    Nowhere,
}

/// Window rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl WindowBounds {
    fn horizontal(&self) -> Range<i32> {
        self.left + 1..self.right
    }

    fn vertical(&self) -> Range<i32> {
        self.top + 1..self.bottom
    }
}

/// Classifies a cursor position against a window rectangle.
///
/// Corners win over edges, edges win over the caption band, and anything
/// else is [`HitZone::Nowhere`] so the caller can fall through to default
/// handling. A `caption_height` of zero disables the caption band entirely;
/// the resize grips keep working.
pub fn classify(
    bounds: WindowBounds,
    cursor_x: i32,
    cursor_y: i32,
    caption_height: i32,
) -> HitZone {
    let near_top = cursor_y < bounds.top + RESIZE_GRIP;
    let near_bottom = cursor_y > bounds.bottom - RESIZE_GRIP;
    let near_left = cursor_x < bounds.left + RESIZE_GRIP;
    let near_right = cursor_x > bounds.right - RESIZE_GRIP;

    if near_top && near_left {
        return HitZone::TopLeft;
    }
    if near_top && near_right {
        return HitZone::TopRight;
    }
    if near_bottom && near_right {
        return HitZone::BottomRight;
    }
    if near_bottom && near_left {
        return HitZone::BottomLeft;
    }

    if bounds.horizontal().contains(&cursor_x) {
        if near_top {
            return HitZone::Top;
        }
        if near_bottom {
            return HitZone::Bottom;
        }
    }
    if bounds.vertical().contains(&cursor_y) {
        if near_left {
            return HitZone::Left;
        }
        if near_right {
            return HitZone::Right;
        }
    }

    if caption_height > 0
        && bounds.horizontal().contains(&cursor_x)
        && cursor_y < bounds.top + caption_height
    {
        return HitZone::Caption;
    }

    HitZone::Nowhere
}

/// System metrics that feed the caption-height formula.
///
/// `base_caption` and `base_frame_padding` are queried at the 96-DPI
/// baseline and scaled linearly; `frame_size` and `border` are queried at
/// the window's actual DPI and enter unscaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionMetrics {
    pub base_caption: i32,
    pub base_frame_padding: i32,
    pub frame_size: i32,
    pub border: i32,
}

/// DPI-aware height of a standard title bar, rounded up to whole pixels.
pub fn standard_caption_height(metrics: CaptionMetrics, scale: f32) -> u32 {
    let linear_part = scale * (metrics.base_caption + metrics.base_frame_padding) as f32;
    (linear_part + (metrics.frame_size + metrics.border) as f32).ceil() as u32
}

/// Full top margin extended into the client area: the standard caption plus
/// room for the tab strip.
pub fn caption_margin(metrics: CaptionMetrics, scale: f32) -> u32 {
    standard_caption_height(metrics, scale) + TAB_STRIP_ALLOWANCE
}

/// Frame state derived from a DPI value: the scale factor, the caption
/// margin in pixels and the same margin in DIPs (the paint translation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMetrics {
    pub scale: f32,
    pub caption_margin: i32,
    pub client_offset_dip: f32,
}

impl FrameMetrics {
    pub fn for_dpi(metrics: CaptionMetrics, dpi: u32) -> Self {
        let scale = dpi as f32 / 96.0;
        let caption_margin = caption_margin(metrics, scale) as i32;
        Self {
            scale,
            caption_margin,
            client_offset_dip: caption_margin as f32 / scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: WindowBounds = WindowBounds {
        left: 100,
        top: 100,
        right: 900,
        bottom: 700,
    };
    const CAPTION: i32 = 33;

    #[test]
    fn classification_is_deterministic() {
        let a = classify(BOUNDS, 500, 105, CAPTION);
        let b = classify(BOUNDS, 500, 105, CAPTION);
        assert_eq!(a, b);
        assert_eq!(a, HitZone::Top);
    }

    #[test]
    fn corners_win_over_edges() {
        assert_eq!(classify(BOUNDS, 102, 102, CAPTION), HitZone::TopLeft);
        assert_eq!(classify(BOUNDS, 898, 102, CAPTION), HitZone::TopRight);
        assert_eq!(classify(BOUNDS, 898, 698, CAPTION), HitZone::BottomRight);
        assert_eq!(classify(BOUNDS, 102, 698, CAPTION), HitZone::BottomLeft);
    }

    #[test]
    fn exact_corner_classifies_as_corner_with_any_caption() {
        for caption in [0, 1, CAPTION, 500] {
            assert_eq!(classify(BOUNDS, 100, 100, caption), HitZone::TopLeft);
            assert_eq!(classify(BOUNDS, 900, 700, caption), HitZone::BottomRight);
        }
    }

    #[test]
    fn top_grip_wins_over_caption() {
        // Inside both the top resize band and the caption band.
        assert_eq!(classify(BOUNDS, 500, 105, CAPTION), HitZone::Top);
        // Below the grip but still inside the caption band.
        assert_eq!(classify(BOUNDS, 500, 120, CAPTION), HitZone::Caption);
    }

    #[test]
    fn edge_bands_exclude_corners() {
        // One pixel into the horizontal interior, still in the top band.
        assert_eq!(classify(BOUNDS, 110, 102, CAPTION), HitZone::Top);
        // At the very left column the vertical interior check keeps it Left.
        assert_eq!(classify(BOUNDS, 102, 400, CAPTION), HitZone::Left);
        assert_eq!(classify(BOUNDS, 898, 400, CAPTION), HitZone::Right);
        assert_eq!(classify(BOUNDS, 500, 698, CAPTION), HitZone::Bottom);
    }

    #[test]
    fn zero_caption_disables_the_caption_band() {
        assert_eq!(classify(BOUNDS, 500, 120, 0), HitZone::Nowhere);
        // Grips are unaffected.
        assert_eq!(classify(BOUNDS, 500, 105, 0), HitZone::Top);
    }

    #[test]
    fn interior_is_nowhere() {
        assert_eq!(classify(BOUNDS, 500, 400, CAPTION), HitZone::Nowhere);
    }

    #[test]
    fn standard_caption_at_unity_scale() {
        let metrics = CaptionMetrics {
            base_caption: 19,
            base_frame_padding: 4,
            frame_size: 0,
            border: 0,
        };
        assert_eq!(standard_caption_height(metrics, 1.0), 23);
        assert_eq!(caption_margin(metrics, 1.0), 33);
    }

    #[test]
    fn fractional_scales_round_up() {
        let metrics = CaptionMetrics {
            base_caption: 19,
            base_frame_padding: 4,
            frame_size: 4,
            border: 1,
        };
        // 1.25 * 23 = 28.75, plus 5 unscaled, ceiled.
        assert_eq!(standard_caption_height(metrics, 1.25), 34);
        // 1.5 * 23 = 34.5, plus 5 unscaled, ceiled.
        assert_eq!(standard_caption_height(metrics, 1.5), 40);
    }

    #[test]
    fn frame_metrics_follow_a_dpi_change() {
        let metrics = CaptionMetrics {
            base_caption: 19,
            base_frame_padding: 4,
            frame_size: 4,
            border: 1,
        };

        let base = FrameMetrics::for_dpi(metrics, 96);
        assert_eq!(base.scale, 1.0);
        assert_eq!(base.caption_margin, 38);
        assert_eq!(base.client_offset_dip, 38.0);

        // Moving to a 150% monitor grows the margin and keeps the DIP
        // offset consistent with it.
        let scaled = FrameMetrics::for_dpi(metrics, 144);
        assert_eq!(scaled.scale, 1.5);
        assert_eq!(scaled.caption_margin, 50);
        assert_eq!(scaled.client_offset_dip, 50.0 / 1.5);
    }
}
