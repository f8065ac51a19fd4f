//! Canned transport shared by the unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{MzaniGoError, Result};
use crate::models::{GeminiRequest, GeminiResponse};
use crate::transport::Transport;

/// Replays queued replies in order and records every request it saw
pub struct CannedTransport {
    replies: Mutex<VecDeque<std::result::Result<GeminiResponse, String>>>,
    seen: Mutex<Vec<GeminiRequest>>,
}

impl CannedTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_text(self, text: &str) -> Self {
        self.push(Ok(GeminiResponse::from_text(text)))
    }

    pub fn with_empty(self) -> Self {
        self.push(Ok(GeminiResponse::default()))
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.push(Err(message.to_string()))
    }

    fn push(self, reply: std::result::Result<GeminiResponse, String>) -> Self {
        self.replies
            .lock()
            .expect("canned transport mutex should not be poisoned")
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<GeminiRequest> {
        self.seen
            .lock()
            .expect("canned transport mutex should not be poisoned")
            .clone()
    }

    pub fn last_prompt(&self) -> String {
        self.requests()
            .last()
            .and_then(|r| r.contents.first())
            .and_then(|c| c.parts.first())
            .map(|p| p.text.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for CannedTransport {
    async fn generate(&self, req: &GeminiRequest) -> Result<GeminiResponse> {
        self.seen
            .lock()
            .expect("canned transport mutex should not be poisoned")
            .push(req.clone());
        let next = self
            .replies
            .lock()
            .expect("canned transport mutex should not be poisoned")
            .pop_front();
        match next {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(message)) => Err(MzaniGoError::Transport(message)),
            None => Err(MzaniGoError::Internal("No more canned responses".to_string())),
        }
    }
}

/// Three well-formed routes for the Noord Street -> Sandton City search
pub const THREE_ROUTES: &str = r#"[
  {"id":"rv-1","type":"BUS","provider":"Rea Vaya","departureTime":"07:10","duration":"42 min","price":17.5,"stops":["Noord Street","Park Station","Sandton City"],"reliability":88},
  {"id":"tx-2","type":"TAXI","provider":"Faraday Taxi Rank","departureTime":"07:05","duration":"35 min","price":22,"stops":["Noord Street","Jan Smuts Ave","Sandton City"],"reliability":64,"isSponsored":true},
  {"id":"gt-3","type":"TRAIN","provider":"Gautrain","departureTime":"07:20","duration":"15 min","price":48,"stops":["Park Station","Rosebank","Sandton"],"reliability":97}
]"#;
