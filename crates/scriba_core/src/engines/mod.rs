//! External inference engines the steps delegate to.
//!
//! Each engine is a trait with a production implementation (HTTP API
//! or configured subprocess) so tests can swap in canned ones.

pub mod assembly_ai;
pub mod diarizer;
pub mod enhancer;
pub mod factory;
pub mod model_cache;
pub mod transcriber;

pub use assembly_ai::AssemblyAiTranscriber;
pub use diarizer::{CommandDiarizer, Diarizer};
pub use enhancer::{CommandEnhancer, Enhancer};
pub use factory::EngineFactory;
pub use model_cache::ModelCache;
pub use transcriber::{Transcriber, TranscriptionOutput};

/// Substitute `{placeholder}` markers in an argument template.
pub(crate) fn expand_placeholders(args: &[String], replacements: &[(&str, &str)]) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let mut expanded = arg.clone();
            for (placeholder, value) in replacements {
                expanded = expanded.replace(placeholder, value);
            }
            expanded
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_every_placeholder_occurrence() {
        let args = vec![
            "--in".to_string(),
            "{input}".to_string(),
            "--out={output}".to_string(),
            "-v".to_string(),
        ];
        let expanded = expand_placeholders(
            &args,
            &[("{input}", "/tmp/a.wav"), ("{output}", "/tmp/b.wav")],
        );
        assert_eq!(expanded, vec!["--in", "/tmp/a.wav", "--out=/tmp/b.wav", "-v"]);
    }
}
