// Pipeline processing: tabular decoding and field normalization

pub mod parser;
pub mod normalize;
