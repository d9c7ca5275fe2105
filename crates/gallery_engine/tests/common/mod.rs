#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use gallery_core::WorkItem;
use gallery_engine::{CaptureError, FailureKind, RenderContext, Renderer};

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(gallery_logging::initialize_for_tests);
}

pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// How a fake page reacts to being loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageBehavior {
    Loads,
    Refuses,
    Hangs,
    Panics,
}

/// In-memory renderer that records how many contexts are open at once.
#[derive(Default)]
pub struct FakeRenderer {
    behaviors: Mutex<HashMap<String, PageBehavior>>,
    load_time: Duration,
    open: Arc<AtomicUsize>,
    peak_open: Arc<AtomicUsize>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    visited: Arc<Mutex<Vec<String>>>,
    document: Option<PathBuf>,
    first_document: Mutex<Option<String>>,
}

impl FakeRenderer {
    pub fn new(load_time: Duration) -> Self {
        Self {
            load_time,
            ..Self::default()
        }
    }

    pub fn with_behavior(self, url: &str, behavior: PageBehavior) -> Self {
        self.behaviors
            .lock()
            .unwrap()
            .insert(url.to_string(), behavior);
        self
    }

    /// Reads `path` when the first context opens, before any capture finishes.
    pub fn watch_document(mut self, path: PathBuf) -> Self {
        self.document = Some(path);
        self
    }

    pub fn first_document(&self) -> Option<String> {
        self.first_document.lock().unwrap().clone()
    }

    pub fn peak_open(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Renderer for FakeRenderer {
    async fn open_context(&self) -> Result<Box<dyn RenderContext>, CaptureError> {
        if let Some(path) = &self.document {
            let mut first = self.first_document.lock().unwrap();
            if first.is_none() {
                *first = std::fs::read_to_string(path).ok();
            }
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            behaviors: self.behaviors.lock().unwrap().clone(),
            load_time: self.load_time,
            open: self.open.clone(),
            closed: self.closed.clone(),
            visited: self.visited.clone(),
            diagnostics: Vec::new(),
            loaded: false,
            is_closed: false,
        }))
    }
}

struct FakePage {
    behaviors: HashMap<String, PageBehavior>,
    load_time: Duration,
    open: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    visited: Arc<Mutex<Vec<String>>>,
    diagnostics: Vec<String>,
    loaded: bool,
    is_closed: bool,
}

#[async_trait::async_trait]
impl RenderContext for FakePage {
    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError> {
        self.visited.lock().unwrap().push(url.to_string());
        tokio::time::sleep(self.load_time).await;
        match self.behaviors.get(url).copied().unwrap_or(PageBehavior::Loads) {
            PageBehavior::Loads => {
                self.diagnostics.push(format!("[log] loaded {url}"));
                self.loaded = true;
                Ok(())
            }
            PageBehavior::Refuses => {
                self.diagnostics.push("[error] net::ERR_CONNECTION_REFUSED".to_string());
                Err(CaptureError::new(
                    FailureKind::Navigation,
                    format!("{url} refused the connection"),
                ))
            }
            PageBehavior::Hangs => {
                std::future::pending::<()>().await;
                Ok(())
            }
            PageBehavior::Panics => panic!("renderer crashed on {url}"),
        }
    }

    async fn settle(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, CaptureError> {
        if self.loaded {
            Ok(FAKE_PNG.to_vec())
        } else {
            Err(CaptureError::new(
                FailureKind::Screenshot,
                "nothing loaded",
            ))
        }
    }

    fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }

    async fn close(&mut self) {
        self.release();
    }
}

impl FakePage {
    fn release(&mut self) {
        if !self.is_closed {
            self.is_closed = true;
            self.open.fetch_sub(1, Ordering::SeqCst);
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakePage {
    fn drop(&mut self) {
        self.release();
    }
}

pub fn item(id: &str, url: &str) -> WorkItem {
    WorkItem {
        id: id.to_string(),
        source_url: url.to_string(),
        target_url: url.to_string(),
        display_label: format!("user{id}"),
    }
}

pub fn items(count: usize) -> Vec<WorkItem> {
    (1..=count)
        .map(|i| item(&i.to_string(), &format!("https://user{i}.github.io/demo")))
        .collect()
}

/// Clock that counts how often the gallery was rendered.
pub fn counting_clock() -> (gallery_engine::Clock, Arc<AtomicUsize>) {
    let renders = Arc::new(AtomicUsize::new(0));
    let counter = renders.clone();
    let clock: gallery_engine::Clock = Arc::new(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("render {n}")
    });
    (clock, renders)
}
