// Pipeline processing: filing normalization, address standardization, and row projection

pub mod address;
pub mod records;
pub mod report_detail;

pub use address::{select_normalizer, PassThroughNormalizer, StreetSuffixNormalizer};
pub use records::ReportItems;
pub use report_detail::ReportDetailNormalizer;
