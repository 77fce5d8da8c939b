pub mod panel;
pub mod text_overlay;
