//! Playground widgets: configuration, controller and render model.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod files;
pub mod render;
pub mod view;
