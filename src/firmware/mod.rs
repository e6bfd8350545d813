pub mod manifest;
pub mod product_line;
pub mod version;

pub use manifest::ManifestReader;
pub use product_line::ProductLine;
pub use version::VersionComparator;
