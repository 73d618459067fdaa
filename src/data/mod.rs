/// Data layer: dataset handle, loading, combination and predicates.
///
/// Architecture:
/// ```text
///  <var>_<...>.nc  (one or more per directory)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset       (DatasetLoader seam)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  combine  │  join per-file datasets along their varying index
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ predicates │  structural questions → bool
///   └────────────┘
/// ```

pub mod combine;
pub mod loader;
pub mod model;
pub mod predicates;
