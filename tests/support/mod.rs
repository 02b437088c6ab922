//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use promptpair::signature::{collect_samples, BuilderConfig, SignatureBuilder, SignatureStore};
use std::fs;
use std::path::{Path, PathBuf};

pub const MOOD_TEMPLATE: &str = r#"[ system ]
You are an AI mood analyzer for Skyrim. Your job is determining the emotional state of NPCs
based on {{ npc.name }}'s recent experiences. Respond with a single word.
[ end system ]
[ user ]
Recent events: {{ events }}
[ end user ]"#;

pub const THOUGHTS_TEMPLATE: &str = r#"[ system ]
You are roleplaying as {{ player.name }}. You are thinking to yourself about the current situation.
Keep it short and stay in character.
[ end system ]
[ user ]
{{ situation }}
[ end user ]"#;

pub const MOOD_SYSTEM: &str = "You are an AI mood analyzer for Skyrim. Your job is determining \
the emotional state of NPCs based on Lydia's recent experiences. Respond with a single word.";

pub const THOUGHTS_SYSTEM: &str = "You are roleplaying as Dovahkiin. You are thinking to \
yourself about the current situation. Keep it short and stay in character.";

/// One header-plus-body record of a request log
pub fn request_entry(timestamp: &str, id: &str, messages: &[(&str, &str)]) -> String {
    let messages: Vec<serde_json::Value> = messages
        .iter()
        .map(|(role, content)| serde_json::json!({ "role": role, "content": content }))
        .collect();
    let body = serde_json::json!({ "model": "test-model", "messages": messages });
    format!(
        "[{}] Generate chat completion [{}]:\n{}\n",
        timestamp, id, body
    )
}

/// One header-plus-body record of a response log
pub fn response_entry(timestamp: &str, id: &str, text: &str) -> String {
    format!(
        "[{}] Generate chat completion response [{}]:\n{}\n",
        timestamp, id, text
    )
}

/// The payload stored for a request built by [`request_entry`].
pub fn joined_contents(messages: &[(&str, &str)]) -> String {
    messages
        .iter()
        .map(|(_, content)| *content)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn write_log(dir: &Path, name: &str, entries: &[String]) -> PathBuf {
    fs::create_dir_all(dir).expect("Failed to create log directory");
    let path = dir.join(name);
    fs::write(&path, entries.concat()).expect("Failed to write log");
    path
}

/// Writes the sample templates and builds their signatures into `types_dir`.
pub fn build_signatures(root: &Path) -> PathBuf {
    let prompts_dir = root.join("prompts");
    fs::create_dir_all(&prompts_dir).expect("Failed to create prompts directory");
    fs::write(prompts_dir.join("evaluate_mood.prompt"), MOOD_TEMPLATE)
        .expect("Failed to write template");
    fs::write(prompts_dir.join("player_thoughts.prompt"), THOUGHTS_TEMPLATE)
        .expect("Failed to write template");

    let samples = collect_samples(&prompts_dir).expect("Failed to collect samples");
    let report = SignatureBuilder::new(BuilderConfig::default()).build_all(&samples);

    let types_dir = root.join("prompt_types");
    SignatureStore::new(&types_dir)
        .save_report(&report)
        .expect("Failed to save signatures");
    types_dir
}

/// Every file below `root` with its contents, keyed by relative path.
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files);
    files.sort();
    files
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<(PathBuf, Vec<u8>)>) {
    for entry in fs::read_dir(dir).expect("Failed to read directory") {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            collect_files(root, &path, files);
        } else {
            let contents = fs::read(&path).expect("Failed to read file");
            files.push((path.strip_prefix(root).unwrap().to_path_buf(), contents));
        }
    }
}
