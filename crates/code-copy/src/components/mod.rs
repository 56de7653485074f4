mod code_sample;

pub use code_sample::CodeSample;
