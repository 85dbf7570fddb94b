//! Data layer: cell and table types, loading, writing, and filtering.
//!
//! Architecture:
//! ```text
//!  .csv / .json
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  Table    │  ordered header, Vec<Row>
//!   └──────────┘
//!        │                     │
//!        ▼                     ▼
//!   ┌──────────┐         ┌──────────┐
//!   │  filter   │         │  writer   │  Table → .csv
//!   └──────────┘         └──────────┘
//! ```

pub mod columns;
pub mod filter;
pub mod identity;
pub mod loader;
pub mod model;
pub mod writer;

pub use crate::error::{DatasetError, Result};
