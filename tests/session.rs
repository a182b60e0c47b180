//! Interactive session tests: a scripted stdin against an in-memory store.

use qiniu_uploader::api::{ListEntry, ObjectStore, PutRet, UploadBody};
use qiniu_uploader::config::SessionConfig;
use qiniu_uploader::error::StoreError;
use qiniu_uploader::path::{HostEnv, PathNormalizer};
use qiniu_uploader::ui::{Session, SessionState};
use qiniu_uploader::upload::Uploader;
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct RecordingStore {
    keys: Arc<Mutex<Vec<String>>>,
    listed: Arc<Mutex<usize>>,
}

impl ObjectStore for RecordingStore {
    fn upload_token(&self, bucket: &str) -> Result<String, StoreError> {
        Ok(format!("ak:sig:{}", bucket))
    }

    fn put(&self, _token: &str, key: &str, mut body: UploadBody) -> Result<PutRet, StoreError> {
        let mut sink = Vec::new();
        body.reader
            .read_to_end(&mut sink)
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        self.keys.lock().unwrap().push(key.to_string());
        Ok(PutRet {
            key: key.to_string(),
            hash: "Fqhash".into(),
        })
    }

    fn list_files(&self, _: &str, prefix: &str, limit: usize) -> Result<Vec<ListEntry>, StoreError> {
        assert_eq!(prefix, "images/");
        assert_eq!(limit, 20);
        *self.listed.lock().unwrap() += 1;
        Ok(vec![ListEntry {
            key: "images/1700000000000000000.png".into(),
            hash: "Fq".into(),
            size: 1024 * 1024,
            mime_type: "image/png".into(),
            put_time: 17_000_000_000_000_000,
        }])
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        access_key: "access-key".into(),
        secret_key: "secret-key".into(),
        bucket: "pics".into(),
        domain: "img.example.net".into(),
        auto_copy_url: false,
        show_progress: false,
        ..Default::default()
    }
}

fn run_script(store: RecordingStore, script: &str) -> (String, SessionState) {
    let config = config();
    let uploader = Uploader::new(
        Some(Box::new(store)),
        &config,
        PathNormalizer::new(HostEnv::Native),
    );
    let mut session = Session::new(&uploader, &config, Cursor::new(script.to_string()), Vec::new());
    session.run().unwrap();
    let state = session.state();
    (String::from_utf8(session.into_output()).unwrap(), state)
}

#[test]
fn exit_words_close_the_session() {
    for script in ["exit\n", "EXIT\n", "quit\n", "\n", ""] {
        let (out, state) = run_script(RecordingStore::default(), script);
        assert_eq!(state, SessionState::Closed, "script {:?}", script);
        assert!(!out.contains("Uploading"));
    }
}

#[test]
fn commands_return_to_prompt() {
    let config = config();
    let store = RecordingStore::default();
    let uploader = Uploader::new(
        Some(Box::new(store.clone())),
        &config,
        PathNormalizer::new(HostEnv::Native),
    );
    let mut session = Session::new(
        &uploader,
        &config,
        Cursor::new("list\nconfig\n/missing/file.png\nexit\n"),
        Vec::new(),
    );

    assert_eq!(session.state(), SessionState::Prompting);
    assert_eq!(session.step().unwrap(), SessionState::Prompting);
    assert_eq!(session.step().unwrap(), SessionState::Prompting);
    assert_eq!(session.step().unwrap(), SessionState::Prompting);
    assert_eq!(session.step().unwrap(), SessionState::Closed);
    assert_eq!(session.step().unwrap(), SessionState::Closed);
    assert_eq!(*store.listed.lock().unwrap(), 1);

    let out = String::from_utf8(session.into_output()).unwrap();
    assert!(out.contains("1700000000000000000.png"));
    assert!(out.contains("https://img.example.net/images/1700000000000000000.png"));
    assert!(out.contains("Size: 1.00 MB"));
    assert!(out.contains("acce***"));
    assert!(!out.contains("secret-key"));
    assert!(out.contains("file does not exist"));
}

#[test]
fn uploads_pasted_path_and_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("holiday photo.JPG");
    std::fs::write(&image, vec![0u8; 2048]).unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, b"hi").unwrap();

    let store = RecordingStore::default();
    let script = format!(
        "  \"{}\"  \n{}\n",
        image.display(),
        notes.display()
    );
    let (out, state) = run_script(store.clone(), &script);

    assert_eq!(state, SessionState::Closed);
    let keys = store.keys.lock().unwrap();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("images/") && keys[0].ends_with(".JPG"));
    assert!(out.contains("Upload successful"));
    assert!(out.contains(&format!("https://img.example.net/{}", keys[0])));
    assert!(out.contains("rejected: unsupported file type"));
}

#[test]
fn unconfigured_uploader_reports_and_continues() {
    let config = SessionConfig::default();
    let uploader = Uploader::new(None, &config, PathNormalizer::new(HostEnv::Native));
    let mut session = Session::new(
        &uploader,
        &config,
        Cursor::new("/tmp/a.png\nlist\n"),
        Vec::new(),
    );
    session.run().unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    let out = String::from_utf8(session.into_output()).unwrap();
    assert_eq!(out.matches("storage is not configured").count(), 2);
}

#[test]
fn non_utf8_line_does_not_end_the_session() {
    let config = config();
    let store = RecordingStore::default();
    let uploader = Uploader::new(
        Some(Box::new(store.clone())),
        &config,
        PathNormalizer::new(HostEnv::Native),
    );
    let mut session = Session::new(
        &uploader,
        &config,
        Cursor::new(b"/tmp/caf\xe9.png\nlist\nexit\n".to_vec()),
        Vec::new(),
    );

    assert_eq!(session.step().unwrap(), SessionState::Prompting);
    session.run().unwrap();
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(*store.listed.lock().unwrap(), 1);
    assert!(store.keys.lock().unwrap().is_empty());

    let out = String::from_utf8(session.into_output()).unwrap();
    assert!(out.contains("invalid input: not valid UTF-8"));
    assert!(out.contains("1700000000000000000.png"));
    assert!(out.contains("Bye!"));
}
