pub mod confirm_overlay;
pub mod detail_overlay;
pub mod footer;
pub mod header;
pub mod render;
pub mod spinner;
pub mod table;
pub mod toolbar;
