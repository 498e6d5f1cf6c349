//! norscope-core - Simulated NOR flash device for failure-analysis training
//!
//! This crate models a 32 MiB NOR flash: address and die-layout math, a
//! byte buffer that obeys the NOR program/erase rule, deterministic program
//! patterns, a check-bit overlay, and a renderer that turns sector contents
//! into reproducible RGB images.
//!
//! # Example
//!
//! ```ignore
//! use norscope_core::{memory::MemoryModel, pattern::PatternSegment, render};
//!
//! let mut mem = MemoryModel::new();
//! mem.program(0, 0x10000, &[PatternSegment::text("Data", 0x10000)], true)?;
//! let bytes = mem.read_sector(0)?;
//! let thumb = render::render_thumbnail(
//!     &bytes,
//!     128,
//!     32,
//!     render::BitOrder::Msb,
//!     render::Orientation::Horizontal,
//!     &render::RenderConfig::default(),
//! )?;
//! println!("{}", render::content_hash(&thumb));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod addressing;
pub mod cache;
pub mod ecc;
pub mod error;
pub mod layout;
pub mod memory;
pub mod pattern;
pub mod preset;
pub mod project;
pub mod render;
pub mod session;

pub use error::{Error, Result};
