// Application boundaries: the ports the pipeline depends on

pub mod ports;

pub use ports::{AddressNormalizer, Fetcher, NullProgress, Progress};
