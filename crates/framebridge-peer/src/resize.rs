//! Resize coordination.
//!
//! The embed observes a [`ContentRoot`] and reports its scroll height; the
//! host keeps the last reported height in a [`LayoutState`]. Both sides
//! publish their state through `tokio::sync::watch` so a presentation layer
//! can react to changes.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The measured element inside the embed whose scroll height sizes the frame.
#[derive(Clone)]
pub struct ContentRoot {
    height: Arc<watch::Sender<u32>>,
}

impl ContentRoot {
    pub fn new(scroll_height: u32) -> Self {
        let (height, _) = watch::channel(scroll_height);
        Self {
            height: Arc::new(height),
        }
    }

    /// Current scroll height in CSS pixels.
    pub fn scroll_height(&self) -> u32 {
        *self.height.borrow()
    }

    /// Record a new layout extent. Observers are notified only on change.
    pub fn set_scroll_height(&self, height: u32) -> bool {
        self.height.send_if_modified(|current| {
            if *current == height {
                return false;
            }
            *current = height;
            true
        })
    }

    /// A size-change observer, already up to date with the current height.
    pub fn observe(&self) -> watch::Receiver<u32> {
        self.height.subscribe()
    }
}

impl fmt::Debug for ContentRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentRoot")
            .field("scroll_height", &self.scroll_height())
            .finish()
    }
}

/// A shared "content not ready yet" flag.
#[derive(Clone)]
pub struct LoadingFlag {
    state: Arc<watch::Sender<bool>>,
}

impl LoadingFlag {
    pub fn new(loading: bool) -> Self {
        let (state, _) = watch::channel(loading);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn get(&self) -> bool {
        *self.state.borrow()
    }

    /// Update the flag. Returns `true` when this call ended a loading phase.
    pub fn set(&self, loading: bool) -> bool {
        let mut finished = false;
        self.state.send_if_modified(|current| {
            if *current == loading {
                return false;
            }
            finished = *current && !loading;
            *current = loading;
            true
        });
        finished
    }

    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl fmt::Debug for LoadingFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoadingFlag").field(&self.get()).finish()
    }
}

/// Host-side layout: the frame height and whether content is ready.
pub struct LayoutState {
    height: watch::Sender<u32>,
    loading: LoadingFlag,
}

impl LayoutState {
    /// Start at `default_height`, loading.
    pub fn new(default_height: u32) -> Self {
        let (height, _) = watch::channel(default_height);
        Self {
            height,
            loading: LoadingFlag::new(true),
        }
    }

    /// Apply a reported height and clear the loading flag.
    ///
    /// Returns `true` when the held height changed. Repeating the same
    /// height is a no-op for observers.
    pub fn apply_resize(&self, height: u32) -> bool {
        let changed = self.height.send_if_modified(|current| {
            if *current == height {
                return false;
            }
            *current = height;
            true
        });
        self.loading.set(false);
        changed
    }

    pub fn height(&self) -> u32 {
        *self.height.borrow()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn watch_height(&self) -> watch::Receiver<u32> {
        self.height.subscribe()
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.loading.watch()
    }
}

impl fmt::Debug for LayoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutState")
            .field("height", &self.height())
            .field("loading", &self.is_loading())
            .finish()
    }
}

pub(crate) type NotifyFn = Arc<dyn Fn(u32) + Send + Sync>;

/// Embed-side size observer and loading flag.
pub(crate) struct EmbedResize {
    notify: NotifyFn,
    loading: LoadingFlag,
    root: Mutex<Option<ContentRoot>>,
    observer: Mutex<Option<JoinHandle<()>>>,
}

impl EmbedResize {
    pub(crate) fn new(initial_loading: bool, notify: NotifyFn) -> Arc<Self> {
        Arc::new(Self {
            notify,
            loading: LoadingFlag::new(initial_loading),
            root: Mutex::new(None),
            observer: Mutex::new(None),
        })
    }

    /// Observe `root`, replacing any previous one, and report its height once.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn attach(&self, root: ContentRoot) {
        self.detach();

        let mut changes = root.observe();
        (self.notify)(root.scroll_height());

        let notify = Arc::clone(&self.notify);
        let task = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let height = *changes.borrow_and_update();
                notify(height);
            }
        });

        *lock(&self.root) = Some(root);
        *lock(&self.observer) = Some(task);
    }

    /// Stop observing. Returns `true` when a root was attached.
    pub(crate) fn detach(&self) -> bool {
        if let Some(task) = lock(&self.observer).take() {
            task.abort();
        }
        lock(&self.root).take().is_some()
    }

    /// Report the current height again. Returns `false` with no root.
    pub(crate) fn notify(&self) -> bool {
        let height = lock(&self.root).as_ref().map(ContentRoot::scroll_height);
        match height {
            Some(height) => {
                (self.notify)(height);
                true
            }
            None => false,
        }
    }

    /// Set the loading flag. Leaving a loading phase schedules one
    /// re-measurement on the next scheduler turn, after layout settles.
    pub(crate) fn set_loading(self: &Arc<Self>, loading: bool) {
        if !self.loading.set(loading) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            this.notify();
        });
    }

    pub(crate) fn loading(&self) -> &LoadingFlag {
        &self.loading
    }
}

impl Drop for EmbedResize {
    fn drop(&mut self) {
        self.detach();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
