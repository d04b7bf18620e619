//! Generic webhook dispatcher
//!
//! A [`Dispatcher`] validates a payload, optionally filters entries by page id,
//! classifies every event and fans it out to the callbacks registered for its
//! category, then to the wildcard callbacks. Callback failures (errors and
//! panics) are caught at the call site and never abort the batch.
//!
//! Dispatch is sequential: entries, events and callbacks run in array and
//! registration order, and each callback is awaited before the next one
//! starts. No timeout is applied, so a callback that never completes stalls
//! the rest of the batch.

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::{PoisonError, RwLock};

use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::category::Category;
use crate::error::{Result, WebhookError};
use crate::events::{Entry, WebhookPayload};
use crate::registry::{callback, Callback, CallbackRegistry};

/// Describes one webhook event family (messages, postbacks, echoes)
pub trait EventFamily: Send + Sync + 'static {
    type Event: Clone + Send + Sync + 'static;
    type Category: Category;

    /// Family name used in log records
    const NAME: &'static str;

    /// Whether `standby` events are dispatched when
    /// [`DispatcherOptions::handle_standby_events`] is set
    const READS_STANDBY: bool = false;

    /// Pure classification of one event
    fn classify(event: &Self::Event) -> Self::Category;

    /// Categories fired after the classified one and before the wildcard
    fn extra_categories(_event: &Self::Event) -> Vec<Self::Category> {
        Vec::new()
    }

    /// Reason to skip the event entirely, if any
    fn skip_reason(_event: &Self::Event) -> Option<&'static str> {
        None
    }

    /// Sender id, for log records
    fn sender_id(event: &Self::Event) -> &str;
}

/// Dispatcher options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherOptions {
    /// Only entries for this page are dispatched
    pub page_id: Option<String>,
    /// Emit warn/error records for skipped entries, skipped events and failing callbacks
    pub enable_logging: bool,
    /// Also dispatch `standby` events (echo family only)
    pub handle_standby_events: bool,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            page_id: None,
            enable_logging: true,
            handle_standby_events: false,
        }
    }
}

impl DispatcherOptions {
    /// Apply the fields present in `update`
    pub fn merge(&mut self, update: DispatcherOptionsUpdate) {
        if let Some(page_id) = update.page_id {
            self.page_id = page_id;
        }
        if let Some(enable_logging) = update.enable_logging {
            self.enable_logging = enable_logging;
        }
        if let Some(handle_standby_events) = update.handle_standby_events {
            self.handle_standby_events = handle_standby_events;
        }
    }
}

/// Partial update for [`DispatcherOptions`]; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherOptionsUpdate {
    /// `Some(None)` clears the page filter
    pub page_id: Option<Option<String>>,
    pub enable_logging: Option<bool>,
    pub handle_standby_events: Option<bool>,
}

impl DispatcherOptionsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_id(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = Some(Some(page_id.into()));
        self
    }

    pub fn clear_page_id(mut self) -> Self {
        self.page_id = Some(None);
        self
    }

    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = Some(enabled);
        self
    }

    pub fn handle_standby_events(mut self, enabled: bool) -> Self {
        self.handle_standby_events = Some(enabled);
        self
    }
}

/// Callback registry + classifier for one event family
pub struct Dispatcher<F: EventFamily> {
    registry: CallbackRegistry<F::Category, F::Event>,
    options: RwLock<DispatcherOptions>,
    _family: PhantomData<F>,
}

impl<F: EventFamily> Dispatcher<F> {
    /// Create a dispatcher with default options and no callbacks
    pub fn new() -> Self {
        Self::with_options(DispatcherOptions::default())
    }

    pub fn with_options(options: DispatcherOptions) -> Self {
        Self {
            registry: CallbackRegistry::new(),
            options: RwLock::new(options),
            _family: PhantomData,
        }
    }

    /// Snapshot of the current options
    pub fn options(&self) -> DispatcherOptions {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merge a partial update into the options
    pub fn set_options(&self, update: DispatcherOptionsUpdate) {
        self.options
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(update);
    }

    /// Register an async function under a category
    pub fn register_for_category<H, Fut>(&self, category: F::Category, handler: H)
    where
        H: Fn(F::Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_callback(category, callback(handler));
    }

    /// Register an already boxed callback under a category
    pub fn register_callback(&self, category: F::Category, callback: Callback<F::Event>) {
        debug!(family = F::NAME, category = %category, "Callback registered");
        self.registry.register(category, callback);
    }

    /// Register a callback for every event of the family
    pub fn on_all<H, Fut>(&self, handler: H)
    where
        H: Fn(F::Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(F::Category::wildcard(), handler);
    }

    /// Number of callbacks registered under a category
    pub fn callback_count(&self, category: &F::Category) -> usize {
        self.registry.len(category)
    }

    /// Categories with at least one callback
    pub fn registered_categories(&self) -> Vec<F::Category> {
        self.registry.categories()
    }

    /// Validate, filter, classify and dispatch every event of a payload.
    ///
    /// Fails only when `payload.object` is not `"page"`, before any callback
    /// runs. Callback failures are absorbed.
    pub async fn process_webhook(&self, payload: &WebhookPayload<F::Event>) -> Result<()> {
        if !payload.is_page() {
            return Err(WebhookError::InvalidObjectType(payload.object.clone()));
        }

        let options = self.options();
        for entry in &payload.entry {
            if !self.accepts_entry(entry, &options) {
                continue;
            }

            for event in &entry.messaging {
                self.dispatch_event(event, &options).await;
            }

            if F::READS_STANDBY && options.handle_standby_events {
                for event in &entry.standby {
                    self.dispatch_event(event, &options).await;
                }
            }
        }

        Ok(())
    }

    fn accepts_entry(&self, entry: &Entry<F::Event>, options: &DispatcherOptions) -> bool {
        match &options.page_id {
            Some(page_id) if *page_id != entry.id => {
                if options.enable_logging {
                    warn!(
                        family = F::NAME,
                        entry_page = %entry.id,
                        expected_page = %page_id,
                        "Skipping entry for another page"
                    );
                }
                false
            }
            _ => true,
        }
    }

    /// Classify one event and run its callbacks
    async fn dispatch_event(&self, event: &F::Event, options: &DispatcherOptions) {
        if let Some(reason) = F::skip_reason(event) {
            if options.enable_logging {
                warn!(family = F::NAME, sender = F::sender_id(event), "Skipping event: {}", reason);
            }
            return;
        }

        let category = F::classify(event);
        debug!(
            family = F::NAME,
            sender = F::sender_id(event),
            category = %category,
            "Dispatching event"
        );

        let mut routes = vec![category];
        routes.extend(F::extra_categories(event));
        routes.push(F::Category::wildcard());

        for route in &routes {
            for callback in self.registry.callbacks(route) {
                if let Err(e) = invoke(&callback, event.clone()).await {
                    if options.enable_logging {
                        error!(family = F::NAME, category = %route, "Callback failed: {:#}", e);
                    }
                }
            }
        }
    }
}

impl<F: EventFamily> Default for Dispatcher<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one callback inside its own failure boundary
async fn invoke<E>(callback: &Callback<E>, event: E) -> anyhow::Result<()> {
    let future = std::panic::catch_unwind(AssertUnwindSafe(move || (callback.as_ref())(event)))
        .map_err(|payload| anyhow::anyhow!("callback panicked: {}", panic_message(&*payload)))?;

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(anyhow::anyhow!(
            "callback panicked: {}",
            panic_message(&*payload)
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::MessageCategory;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Minimal family over plain strings: the category is the string itself
    struct Words;

    impl EventFamily for Words {
        type Event = String;
        type Category = MessageCategory;
        const NAME: &'static str = "words";

        fn classify(event: &String) -> MessageCategory {
            event.parse().unwrap_or(MessageCategory::Unknown)
        }

        fn skip_reason(event: &String) -> Option<&'static str> {
            (event == "skip").then_some("asked to skip")
        }

        fn sender_id(_event: &String) -> &str {
            "tester"
        }
    }

    fn payload(entries: Vec<Entry<String>>) -> WebhookPayload<String> {
        WebhookPayload::page(entries)
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn counter(dispatcher: &Dispatcher<Words>, category: MessageCategory) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        dispatcher.register_for_category(category, move |_event| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        count
    }

    #[tokio::test]
    async fn test_rejects_non_page_object_before_any_callback() {
        let dispatcher: Dispatcher<Words> = Dispatcher::new();
        let all = counter(&dispatcher, MessageCategory::All);

        let mut p = payload(vec![Entry::new("p", 0, words(&["text"]))]);
        p.object = "instagram".to_string();

        let err = dispatcher.process_webhook(&p).await.unwrap_err();
        assert!(matches!(err, WebhookError::InvalidObjectType(ref o) if o == "instagram"));
        assert!(err.to_string().starts_with("Invalid webhook object type"));
        assert_eq!(all.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wildcard_sees_every_event() {
        let dispatcher: Dispatcher<Words> = Dispatcher::new();
        let all = counter(&dispatcher, MessageCategory::All);
        let text = counter(&dispatcher, MessageCategory::Text);

        let p = payload(vec![
            Entry::new("p", 0, words(&["text", "attachment"])),
            Entry::new("p", 0, words(&["whatever"])),
        ]);
        dispatcher.process_webhook(&p).await.unwrap();

        assert_eq!(all.load(Ordering::SeqCst), 3);
        assert_eq!(text.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_specific_callbacks_run_before_wildcard_in_order() {
        let dispatcher: Dispatcher<Words> = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (category, tag) in [
            (MessageCategory::All, "all-1"),
            (MessageCategory::Text, "text-1"),
            (MessageCategory::Text, "text-2"),
            (MessageCategory::All, "all-2"),
        ] {
            let log = Arc::clone(&log);
            dispatcher.register_for_category(category, move |_event| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(tag);
                    Ok(())
                }
            });
        }

        dispatcher
            .process_webhook(&payload(vec![Entry::new("p", 0, words(&["text"]))]))
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["text-1", "text-2", "all-1", "all-2"]);
    }

    #[tokio::test]
    async fn test_failing_callback_is_isolated() {
        let dispatcher: Dispatcher<Words> = Dispatcher::new();
        dispatcher.register_for_category(MessageCategory::Text, |_event| async {
            Err(anyhow::anyhow!("boom"))
        });
        let second = counter(&dispatcher, MessageCategory::Text);
        let all = counter(&dispatcher, MessageCategory::All);

        let p = payload(vec![Entry::new("p", 0, words(&["text", "text"]))]);
        dispatcher.process_webhook(&p).await.unwrap();

        assert_eq!(second.load(Ordering::SeqCst), 2);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panicking_callback_is_isolated() {
        let dispatcher: Dispatcher<Words> = Dispatcher::new();
        dispatcher.register_callback(
            MessageCategory::Text,
            Arc::new(|_event: String| -> crate::registry::HandlerFuture {
                panic!("sync panic")
            }),
        );
        dispatcher.register_for_category(MessageCategory::Text, |event: String| async move {
            if event == "text" {
                panic!("async panic");
            }
            Ok(())
        });
        let after = counter(&dispatcher, MessageCategory::Text);

        let p = payload(vec![Entry::new("p", 0, words(&["text"]))]);
        dispatcher.process_webhook(&p).await.unwrap();

        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_page_filter_skips_other_pages() {
        let dispatcher: Dispatcher<Words> = Dispatcher::new();
        dispatcher.set_options(DispatcherOptionsUpdate::new().page_id("P1"));
        let all = counter(&dispatcher, MessageCategory::All);

        let p = payload(vec![
            Entry::new("P2", 0, words(&["text", "text"])),
            Entry::new("P1", 0, words(&["text"])),
        ]);
        dispatcher.process_webhook(&p).await.unwrap();

        assert_eq!(all.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_skip_reason_suppresses_wildcard() {
        let dispatcher: Dispatcher<Words> = Dispatcher::new();
        let all = counter(&dispatcher, MessageCategory::All);

        let p = payload(vec![Entry::new("p", 0, words(&["skip", "text"]))]);
        dispatcher.process_webhook(&p).await.unwrap();

        assert_eq!(all.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_standby_ignored_for_families_without_standby() {
        let dispatcher: Dispatcher<Words> = Dispatcher::new();
        dispatcher.set_options(DispatcherOptionsUpdate::new().handle_standby_events(true));
        let all = counter(&dispatcher, MessageCategory::All);

        let p = payload(vec![Entry::new("p", 0, vec![]).with_standby(words(&["text"]))]);
        dispatcher.process_webhook(&p).await.unwrap();

        assert_eq!(all.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_set_options_merges_partial_updates() {
        let dispatcher: Dispatcher<Words> = Dispatcher::new();
        assert_eq!(dispatcher.options(), DispatcherOptions::default());

        dispatcher.set_options(DispatcherOptionsUpdate::new().page_id("P1"));
        dispatcher.set_options(DispatcherOptionsUpdate::new().enable_logging(false));

        let options = dispatcher.options();
        assert_eq!(options.page_id.as_deref(), Some("P1"));
        assert!(!options.enable_logging);
        assert!(!options.handle_standby_events);

        dispatcher.set_options(DispatcherOptionsUpdate::new().clear_page_id());
        assert!(dispatcher.options().page_id.is_none());
        assert!(!dispatcher.options().enable_logging);
    }

    #[tokio::test]
    async fn test_callback_registered_during_dispatch_applies_to_later_events() {
        let dispatcher = Arc::new(Dispatcher::<Words>::new());
        let late = Arc::new(AtomicUsize::new(0));

        let d = Arc::downgrade(&dispatcher);
        let late_count = Arc::clone(&late);
        dispatcher.register_for_category(MessageCategory::Text, move |_event| {
            let d = d.clone();
            let late_count = Arc::clone(&late_count);
            async move {
                if let Some(d) = d.upgrade() {
                    if d.callback_count(&MessageCategory::Attachment) == 0 {
                        d.register_for_category(MessageCategory::Attachment, move |_event| {
                            let late_count = Arc::clone(&late_count);
                            async move {
                                late_count.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }
                        });
                    }
                }
                Ok(())
            }
        });

        let p = payload(vec![Entry::new("p", 0, words(&["attachment", "text", "attachment"]))]);
        dispatcher.process_webhook(&p).await.unwrap();

        assert_eq!(late.load(Ordering::SeqCst), 1);
    }
}
