//! # UI Common Components and Utilities
//!
//! Shared styling and formatting helpers for the viewer's panels.
//!
//! ## Why This Module Exists
//! Every panel draws framed rows in the same dark palette and prints scene
//! transforms the same way. Keeping the palette and the formatters here keeps
//! the manual controls, the node inspector and the error list consistent.
//!
//! ## Theme
//! [`UiColors`] holds compile-time color constants. The palette goes from the
//! darkest background (`EXTREME_BG`) to the lightest (`MAIN_BG`), plus status
//! colors for visible/hidden nodes and errors.

use eframe::egui::{Color32, Frame, Stroke};
use glam::{Quat, Vec3};

/// Creates a styled frame with consistent margins and border.
///
/// # Parameters
/// - `bg_color`: Background color for the frame interior
/// - `border_color`: Color for the frame border
pub fn create_frame(bg_color: Color32, border_color: Color32) -> Frame {
    Frame::new()
        .stroke(Stroke::new(1.0, border_color))
        .fill(bg_color)
        .inner_margin(4)
        .outer_margin(2)
}

pub fn format_vec3(v: Vec3) -> String {
    format!("({:.4}, {:.4}, {:.4})", v.x, v.y, v.z)
}

pub fn format_quat(q: Quat) -> String {
    format!("({:.4}, {:.4}, {:.4}, {:.4})", q.x, q.y, q.z, q.w)
}

/// Dark theme palette.
pub struct UiColors;

impl UiColors {
    /// Primary background color for main content areas (RGB: 30, 30, 30)
    pub const MAIN_BG: Color32 = Color32::from_rgb(30, 30, 30);

    /// Secondary background color for nested components (RGB: 25, 25, 25)
    pub const INNER_BG: Color32 = Color32::from_rgb(25, 25, 25);

    /// Deepest background color for emphasized content areas (RGB: 20, 20, 20)
    pub const EXTREME_BG: Color32 = Color32::from_rgb(20, 20, 20);

    /// Border color for component separation (RGB: 60, 60, 60)
    pub const BORDER: Color32 = Color32::from_rgb(60, 60, 60);

    /// Visible node / resolved name (RGB: 50, 200, 20) - Green
    pub const ACTIVE: Color32 = Color32::from_rgb(50, 200, 20);

    /// Hidden node / unresolved name / error (RGB: 200, 50, 20) - Red
    pub const INACTIVE: Color32 = Color32::from_rgb(200, 50, 20);
}
