#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use imagi::upstream::{Upstream, UpstreamError};

pub const TEMPLATE: &str =
    "README:{read_me}\nFILES:{filenames}\nCODE:{contents}\nTESTS:{test_results}";

/// What the mocked model does when called.
#[derive(Clone)]
pub enum Reply {
    Text(&'static str),
    Nothing,
    Fail,
    Hang,
}

pub struct MockUpstream {
    reply:       Reply,
    calls:       AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockUpstream {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().expect("prompt lock").clone()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    fn provider(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().expect("prompt lock") = Some(prompt.to_string());

        match &self.reply {
            Reply::Text(text) => Ok(Some(text.to_string())),
            Reply::Nothing => Ok(None),
            Reply::Fail => Err(UpstreamError::Status {
                provider: "mock",
                status:   429,
                body:     "secret quota detail".into(),
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Some("Pass: too late".into()))
            }
        }
    }
}
