//! Terminal rendering using ratatui.
//!
//! ## Submodules
//!
//! - [`common`]: header bar, tab bar, status bar, help overlay
//! - [`devices`]: the device table with liveness badges and pulse styling
//! - [`sensors`]: the sensor catalog table
//! - [`detail`]: the device detail overlay with sparklines
//! - [`theme`]: light/dark theming with terminal auto-detection

pub mod common;
pub mod detail;
pub mod devices;
pub mod sensors;
pub mod theme;

pub use theme::Theme;
