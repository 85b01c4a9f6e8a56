// Pipeline ingestion: remote back-office export retrieval

pub mod back_office;

pub use back_office::RemoteDatasetFetcher;
