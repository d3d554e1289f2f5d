//! HTTP clients for the two external collaborators of the engine: the NLP
//! annotation service and an OpenAI-compatible chat-completions endpoint.
//!
//! Both map transport failures onto the closed error kinds of
//! `wortschatz-core`, so nothing `reqwest`-specific crosses this crate.

pub mod annotator;
pub mod generator;

pub use annotator::{AnnotatorConfig, HttpAnnotator};
pub use generator::{GeneratorConfig, HttpGenerator};

#[cfg(test)]
mod tests;
