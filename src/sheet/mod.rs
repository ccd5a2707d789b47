//! Spreadsheet shape detection and normalization.

pub mod grid;
pub mod header;
pub mod normalize;
pub mod preprocess;
pub mod table;

pub use grid::{load_grid, Cell, RawGrid};
pub use header::{locate, DetectMode, HeaderPosition};
pub use normalize::{normalize_files, NormalizedSheet};
pub use table::Table;
