//! Package index access (C3): resolves candidate versions and requirement
//! strings for a package name against a PyPI-shaped HTTP index.

mod cache;
mod client;

pub use client::HttpIndexClient;
