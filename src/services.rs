pub mod normals_import_service;

pub use normals_import_service::{
    ImportSummary, ImportedStation, NormalsImportService, StationError, StationNormals,
};
