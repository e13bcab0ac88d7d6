//! Integration tests for the GLM nodes.
//!
//! These run each node end to end against a recording backend: real files
//! under a temp root, an injected environment, and no network.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use glm_nodes::api::{ChatBackend, ChatFuture, Connector};
use glm_nodes::config::NodePaths;
use glm_nodes::credential::{EnvLookup, empty_env};
use glm_nodes::nodes::{NodeContext, NodeSet, text_chat, translate, vision};
use glm_nodes::prompt::defaults::{TEXT_CHAT_PROMPT, VISION_PROMPT};
use glm_nodes::{ChatCompletion, ChatRequest, NodeError};

/// Records every key it is asked to connect with and every request sent.
#[derive(Default)]
struct Recorder {
    keys: Mutex<Vec<String>>,
    requests: Mutex<Vec<ChatRequest>>,
    failure: Option<String>,
    reply: Option<String>,
}

impl Recorder {
    fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn last_request(&self) -> serde_json::Value {
        let requests = self.requests();
        let last = requests.last().expect("no request recorded");
        serde_json::to_value(last).unwrap()
    }
}

struct RecordingConnector(Arc<Recorder>);

struct RecordingBackend(Arc<Recorder>);

impl Connector for RecordingConnector {
    fn connect(&self, api_key: &str) -> Result<Box<dyn ChatBackend>, String> {
        self.0.keys.lock().unwrap().push(api_key.to_string());
        Ok(Box::new(RecordingBackend(self.0.clone())))
    }
}

impl ChatBackend for RecordingBackend {
    fn complete<'a>(&'a self, request: &'a ChatRequest) -> ChatFuture<'a> {
        Box::pin(async move {
            self.0.requests.lock().unwrap().push(request.clone());
            match &self.0.failure {
                Some(message) => Err(message.clone()),
                None => Ok(ChatCompletion {
                    id: Some("test-completion".into()),
                    content: Some(
                        self.0
                            .reply
                            .clone()
                            .unwrap_or_else(|| format!("reply from {}", request.model)),
                    ),
                    usage: None,
                    finish_reason: Some("stop".into()),
                }),
            }
        })
    }
}

struct RefusingConnector;

impl Connector for RefusingConnector {
    fn connect(&self, _api_key: &str) -> Result<Box<dyn ChatBackend>, String> {
        Err("API key is not a valid header value".to_string())
    }
}

fn env_with(vars: &[(&str, &str)]) -> EnvLookup {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(move |name| vars.get(name).cloned())
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// A node set rooted at `root`, with no environment and a recording backend.
fn node_set(root: &Path, recorder: &Arc<Recorder>) -> NodeSet {
    node_set_with_env(root, recorder, empty_env())
}

fn node_set_with_env(root: &Path, recorder: &Arc<Recorder>, env: EnvLookup) -> NodeSet {
    let ctx = NodeContext::new(
        NodePaths::new(root),
        Arc::new(RecordingConnector(recorder.clone())),
    )
    .with_env(env);
    NodeSet::new().with_glm_nodes(Arc::new(ctx))
}

fn system_prompt(request: &serde_json::Value) -> String {
    request["messages"][0]["content"]
        .as_str()
        .unwrap()
        .to_string()
}

// ── Registry ─────────────────────────────────────────────────────────

#[tokio::test]
async fn registry_exposes_three_nodes_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let nodes = node_set(dir.path(), &Arc::default());
    assert_eq!(
        nodes.names(),
        vec![text_chat::NAME, vision::NAME, translate::NAME]
    );

    let defs = nodes.definitions();
    assert!(defs.iter().all(|d| d.category == "GLM"));
    assert_eq!(defs[0].return_names, vec!["response_text"]);
    assert_eq!(defs[1].return_names, vec!["GETPrompt"]);
    assert_eq!(defs[2].return_names, vec!["translated_text"]);
}

#[tokio::test]
async fn unknown_node_lists_known_names() {
    let dir = tempfile::tempdir().unwrap();
    let nodes = node_set(dir.path(), &Arc::default());
    let out = nodes.execute("GLM_Nope", "{}").await;
    assert!(out.starts_with("Error: unknown node 'GLM_Nope'"));
    assert!(out.contains(text_chat::NAME));
}

#[tokio::test]
async fn preset_names_come_from_catalog_file() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "prompts/text_chat.json",
        r#"{"cinematic": "Film it.", "anime": "Draw it."}"#,
    );
    let nodes = node_set(dir.path(), &Arc::default());
    let defs = nodes.definitions();
    assert_eq!(
        defs[0].inputs["properties"]["preset"]["examples"],
        serde_json::json!(["cinematic", "anime"])
    );
    // No vision catalog on disk: the built-in entry is offered.
    assert_eq!(
        defs[1].inputs["properties"]["preset"]["examples"],
        serde_json::json!(["default"])
    );
}

#[tokio::test]
async fn first_catalog_key_is_the_default_preset() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "prompts/text_chat.json",
        r#"{"first": "FIRST BODY", "second": "S"}"#,
    );
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);

    let defs = nodes.definitions();
    assert_eq!(defs[0].inputs["properties"]["preset"]["default"], "first");
    // Without a catalog file there is no default selection.
    assert!(defs[1].inputs["properties"]["preset"].get("default").is_none());

    nodes
        .execute(text_chat::NAME, r#"{"text_input": "hi", "api_key": "k"}"#)
        .await;
    assert_eq!(system_prompt(&recorder.last_request()), "FIRST BODY");
}

#[tokio::test]
async fn sampling_defaults_are_exact_in_definitions() {
    let dir = tempfile::tempdir().unwrap();
    let nodes = node_set(dir.path(), &Arc::default());
    let defs = nodes.definitions();
    assert_eq!(defs[0].inputs["properties"]["temperature"]["default"], 0.9);
    assert_eq!(defs[0].inputs["properties"]["top_p"]["default"], 0.7);
    assert_eq!(defs[2].inputs["properties"]["temperature"]["default"], 0.3);
}

#[tokio::test]
async fn out_of_range_input_rejected_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);
    let out = nodes
        .execute(
            text_chat::NAME,
            r#"{"text_input": "hi", "api_key": "k", "temperature": 1.5}"#,
        )
        .await;
    assert!(out.starts_with("Error: invalid inputs"), "{out}");
    assert!(recorder.keys().is_empty());
}

// ── Credentials ──────────────────────────────────────────────────────

#[tokio::test]
async fn missing_key_never_calls_service() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);

    for (name, inputs) in [
        (text_chat::NAME, r#"{"text_input": "hi"}"#),
        (vision::NAME, r#"{"image_url": "https://example.com/a.jpg"}"#),
        (translate::NAME, r#"{"text": "你好"}"#),
    ] {
        let out = nodes.execute(name, inputs).await;
        assert!(out.starts_with("Error:"), "{name}: {out}");
        assert!(out.contains("ZHIPUAI_API_KEY"), "{name}: {out}");
    }
    assert!(recorder.keys().is_empty());
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn explicit_key_beats_environment_and_config() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config.json", r#"{"ZHIPUAI_API_KEY": "from-config"}"#);
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set_with_env(
        dir.path(),
        &recorder,
        env_with(&[("ZHIPUAI_API_KEY", "from-env")]),
    );

    nodes
        .execute(text_chat::NAME, r#"{"text_input": "hi", "api_key": " explicit "}"#)
        .await;
    nodes
        .execute(text_chat::NAME, r#"{"text_input": "hi"}"#)
        .await;
    assert_eq!(recorder.keys(), vec!["explicit", "from-env"]);
}

#[tokio::test]
async fn config_file_key_used_as_last_resort() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config.json", r#"{"ZHIPUAI_API_KEY": "abc"}"#);
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set_with_env(
        dir.path(),
        &recorder,
        env_with(&[("ZHIPUAI_API_KEY", "   ")]),
    );

    let out = nodes
        .execute(text_chat::NAME, r#"{"text_input": "hi"}"#)
        .await;
    assert_eq!(out, "reply from glm-4-flash-250414");
    assert_eq!(recorder.keys(), vec!["abc"]);
}

#[tokio::test]
async fn client_init_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = NodeContext::new(NodePaths::new(dir.path()), Arc::new(RefusingConnector))
        .with_env(empty_env());
    let nodes = NodeSet::new().with_glm_nodes(Arc::new(ctx));
    let out = nodes
        .execute(text_chat::NAME, r#"{"text_input": "hi", "api_key": "bad\nkey"}"#)
        .await;
    assert!(out.starts_with("Error: failed to initialize"), "{out}");
}

// ── Text chat ────────────────────────────────────────────────────────

#[tokio::test]
async fn text_chat_uses_builtin_prompt_without_files() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);

    let out = nodes
        .execute(
            text_chat::NAME,
            r#"{"text_input": "a puppy on the grass", "api_key": "k", "seed": 7}"#,
        )
        .await;
    assert_eq!(out, "reply from glm-4-flash-250414");

    let request = recorder.last_request();
    assert_eq!(system_prompt(&request), TEXT_CHAT_PROMPT.as_str());
    assert_eq!(request["messages"][1]["content"], "a puppy on the grass");
    assert_eq!(request["max_tokens"], 1024);
    assert!(request.get("seed").is_none());
}

#[tokio::test]
async fn text_chat_prompt_precedence() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "prompts/text_chat.json",
        r#"{"concise": "Answer briefly."}"#,
    );
    write(dir.path(), "prompts/text_chat.txt", "Template prompt.");
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);

    let cases = [
        (
            r#"{"text_input": "hi", "api_key": "k", "system_prompt_override": "Be a pirate.", "preset": "concise"}"#,
            "Be a pirate.",
        ),
        (
            r#"{"text_input": "hi", "api_key": "k", "preset": "concise"}"#,
            "Answer briefly.",
        ),
        (
            r#"{"text_input": "hi", "api_key": "k", "preset": "missing"}"#,
            "Template prompt.",
        ),
    ];
    for (inputs, expected) in cases {
        nodes.execute(text_chat::NAME, inputs).await;
        assert_eq!(system_prompt(&recorder.last_request()), expected);
    }
}

#[tokio::test]
async fn text_chat_rereads_files_between_calls() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);
    let inputs = r#"{"text_input": "hi", "api_key": "k"}"#;

    nodes.execute(text_chat::NAME, inputs).await;
    assert_eq!(
        system_prompt(&recorder.last_request()),
        TEXT_CHAT_PROMPT.as_str()
    );

    write(dir.path(), "prompts/text_chat.txt", "Edited template.");
    nodes.execute(text_chat::NAME, inputs).await;
    assert_eq!(system_prompt(&recorder.last_request()), "Edited template.");
}

#[tokio::test]
async fn text_chat_blank_input_rejected_after_key_check() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);
    let out = nodes
        .execute(text_chat::NAME, r#"{"text_input": "   ", "api_key": "k"}"#)
        .await;
    assert_eq!(out, "Error: text_input cannot be empty");
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn api_failure_becomes_error_output() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::failing("Zhipu API HTTP 401: unauthorized"));
    let nodes = node_set(dir.path(), &recorder);
    let out = nodes
        .execute(
            text_chat::NAME,
            r#"{"text_input": "hi", "api_key": "k", "model_name": "glm-4-plus"}"#,
        )
        .await;
    assert_eq!(
        out,
        "Error: glm-4-plus API call failed: Zhipu API HTTP 401: unauthorized"
    );
}

#[tokio::test]
async fn reply_starting_with_error_prefix_is_still_a_success() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::replying("Error: is a common word in logs"));
    let nodes = node_set(dir.path(), &recorder);
    let out = nodes
        .try_execute(text_chat::NAME, r#"{"text_input": "hi", "api_key": "k"}"#)
        .await;
    assert_eq!(out, Ok("Error: is a common word in logs".to_string()));

    let err = nodes
        .try_execute(text_chat::NAME, r#"{"text_input": "hi"}"#)
        .await
        .unwrap_err();
    assert_eq!(err, NodeError::MissingApiKey);
}

// ── Vision ───────────────────────────────────────────────────────────

#[tokio::test]
async fn vision_requires_an_image() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);
    let out = nodes
        .execute(vision::NAME, r#"{"api_key": "k", "image_url": "  "}"#)
        .await;
    assert!(out.starts_with("Error:"));
    assert!(out.contains("image"));
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn vision_prefers_base64_and_adds_jpeg_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);

    let out = nodes
        .execute(
            vision::NAME,
            r#"{"api_key": "k", "image_base64": "QUJD", "image_url": "https://example.com/a.jpg"}"#,
        )
        .await;
    assert_eq!(out, "reply from glm-4v-flash");

    let request = recorder.last_request();
    let parts = &request["messages"][0]["content"];
    assert_eq!(parts[0]["type"], "text");
    assert_eq!(parts[0]["text"], VISION_PROMPT.as_str());
    assert_eq!(parts[1]["type"], "image_url");
    assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,QUJD");
}

#[tokio::test]
async fn vision_keeps_existing_data_uri_and_urls() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);

    nodes
        .execute(
            vision::NAME,
            r#"{"api_key": "k", "image_base64": "data:image/png;base64,iVBO"}"#,
        )
        .await;
    assert_eq!(
        recorder.last_request()["messages"][0]["content"][1]["image_url"]["url"],
        "data:image/png;base64,iVBO"
    );

    nodes
        .execute(
            vision::NAME,
            r#"{"api_key": "k", "image_url": " https://example.com/cat.png ", "prompt": "Name the animal."}"#,
        )
        .await;
    let request = recorder.last_request();
    assert_eq!(request["messages"][0]["content"][0]["text"], "Name the animal.");
    assert_eq!(
        request["messages"][0]["content"][1]["image_url"]["url"],
        "https://example.com/cat.png"
    );
}

// ── Translate ────────────────────────────────────────────────────────

#[tokio::test]
async fn translate_uses_config_languages() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "config.json",
        r#"{"ZHIPUAI_API_KEY": "k", "source_lang": "zh", "target_lang": "ja"}"#,
    );
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);

    let out = nodes.execute(translate::NAME, r#"{"text": "你好"}"#).await;
    assert_eq!(out, "reply from glm-4-flash-250414");

    let request = recorder.last_request();
    let system = system_prompt(&request);
    assert!(system.contains("zh"), "{system}");
    assert!(system.contains("ja"), "{system}");
    assert!(!system.contains("{target_lang}"));
    assert_eq!(request["messages"][1]["content"], "你好");
}

#[tokio::test]
async fn translate_inputs_override_config_languages() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config.json", r#"{"target_lang": "ja"}"#);
    write(
        dir.path(),
        "prompts/translate.txt",
        "Translate {source_lang} into {target_lang}.",
    );
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);

    nodes
        .execute(
            translate::NAME,
            r#"{"text": "bonjour", "target_lang": "de", "api_key": "k"}"#,
        )
        .await;
    assert_eq!(
        system_prompt(&recorder.last_request()),
        "Translate auto into de."
    );
}

#[tokio::test]
async fn translate_blank_text_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let nodes = node_set(dir.path(), &recorder);
    let out = nodes
        .execute(translate::NAME, r#"{"text": "", "api_key": "k"}"#)
        .await;
    assert_eq!(out, "Error: text cannot be empty");
    assert!(recorder.requests().is_empty());
}
